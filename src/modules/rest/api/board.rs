// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use serde::{Deserialize, Serialize};

use crate::modules::common::auth::ClientContext;
use crate::modules::error::code::ErrorCode;
use crate::modules::forum::board::Board;
use crate::modules::forum::post::Post;
use crate::modules::forum::topic::Topic;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::raise_error;

pub struct BoardApi;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct BoardCreateRequest {
    pub name: String,
    /// Dedicated inbound address for new-topic-by-address submissions.
    pub inbound_address: Option<String>,
    /// Whether posts on this board count toward member post counts.
    pub count_posts: Option<bool>,
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Board")]
impl BoardApi {
    /// Creates a board. Requires root permission.
    #[oai(path = "/boards", method = "post", operation_id = "create_board")]
    async fn create_board(
        &self,
        request: Json<BoardCreateRequest>,
        context: ClientContext,
    ) -> ApiResult<Json<Board>> {
        context.require_root()?;
        let mut board = Board::new(&request.0.name, request.0.inbound_address);
        if let Some(count_posts) = request.0.count_posts {
            board.count_posts = count_posts;
        }
        board.save().await?;
        Ok(Json(board))
    }

    /// Lists all boards.
    #[oai(path = "/boards", method = "get", operation_id = "list_boards")]
    async fn list_boards(&self) -> ApiResult<Json<Vec<Board>>> {
        Ok(Json(Board::list_all().await?))
    }

    /// Retrieves a single board.
    #[oai(path = "/boards/:id", method = "get", operation_id = "get_board")]
    async fn get_board(&self, id: Path<u64>) -> ApiResult<Json<Board>> {
        let board = Board::get(id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Board with id={} not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(board))
    }

    /// Lists the topics on a board.
    #[oai(path = "/boards/:id/topics", method = "get", operation_id = "list_board_topics")]
    async fn list_board_topics(&self, id: Path<u64>) -> ApiResult<Json<Vec<Topic>>> {
        Ok(Json(Topic::list_by_board(id.0).await?))
    }

    /// Lists the posts of a topic.
    #[oai(path = "/topics/:id/posts", method = "get", operation_id = "list_topic_posts")]
    async fn list_topic_posts(&self, id: Path<u64>) -> ApiResult<Json<Vec<Post>>> {
        Ok(Json(Post::list_by_topic(id.0).await?))
    }
}
