// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::{
    id,
    modules::{
        database::{
            async_find_impl, insert_impl, list_all_impl, manager::DB_MANAGER, secondary_find_impl,
            update_impl,
        },
        error::{code::ErrorCode, MailBoardResult},
    },
    raise_error, utc_now,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct Board {
    /// The unique identifier of this board.
    #[primary_key]
    pub id: u64,

    /// Display name of the board.
    pub name: String,

    /// Dedicated inbound address for new-topic-by-address submissions,
    /// stored lowercased. One-to-one address→board mapping.
    #[secondary_key(unique, optional)]
    pub inbound_address: Option<String>,

    /// Number of topics on this board.
    pub topic_count: u64,

    /// Number of posts on this board.
    pub post_count: u64,

    /// Whether posts on this board count toward member post counts.
    pub count_posts: bool,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Board {
    pub fn new(name: &str, inbound_address: Option<String>) -> Self {
        Self {
            id: id!(64),
            name: name.trim().to_string(),
            inbound_address: inbound_address.map(|a| a.trim().to_lowercase()),
            topic_count: 0,
            post_count: 0,
            count_posts: true,
            created_at: utc_now!(),
        }
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        if self.name.is_empty() {
            return Err(raise_error!(
                "board name must not be empty".into(),
                ErrorCode::InvalidParameter
            ));
        }
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn get(id: u64) -> MailBoardResult<Option<Board>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    pub async fn find_by_address(address: &str) -> MailBoardResult<Option<Board>> {
        secondary_find_impl(
            DB_MANAGER.meta_db(),
            BoardKey::inbound_address,
            Some(address.trim().to_lowercase()),
        )
        .await
    }

    pub async fn list_all() -> MailBoardResult<Vec<Board>> {
        list_all_impl(DB_MANAGER.meta_db()).await
    }

    /// Counter bookkeeping after content creation. `new_topic` also bumps the
    /// topic count.
    pub async fn record_post(id: u64, new_topic: bool) -> MailBoardResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<Board>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Board with id={} not found", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.post_count += 1;
                if new_topic {
                    updated.topic_count += 1;
                }
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn board_resolves_by_inbound_address() {
        let board = Board::new("Announcements", Some("Announce@Forum.Example".into()));
        board.save().await.unwrap();

        let found = Board::find_by_address("announce@forum.example")
            .await
            .unwrap();
        assert_eq!(found.map(|b| b.id), Some(board.id));

        let missing = Board::find_by_address("nobody@forum.example").await.unwrap();
        assert!(missing.is_none());
    }
}
