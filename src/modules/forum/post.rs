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
            async_find_impl, filter_by_secondary_key_impl, insert_impl, manager::DB_MANAGER,
        },
        error::MailBoardResult,
    },
    utc_now,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct Post {
    /// The unique identifier of this post.
    #[primary_key]
    pub id: u64,

    /// The topic this post belongs to.
    #[secondary_key]
    pub topic_id: u64,

    /// The board this post belongs to, denormalized for counter updates.
    pub board_id: u64,

    /// Subject line, usually the topic subject with a localized reply prefix.
    pub subject: String,

    /// Post body in forum markup.
    pub body: String,

    pub poster_id: u64,
    pub poster_name: String,
    pub poster_email: String,

    /// Unapproved posts are held for moderation.
    pub approved: bool,

    /// Source IP when the post arrived over the admin API; spool ingest has none.
    pub ip: Option<String>,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Post {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        topic_id: u64,
        board_id: u64,
        subject: &str,
        body: &str,
        poster_id: u64,
        poster_name: &str,
        poster_email: &str,
        approved: bool,
        ip: Option<String>,
    ) -> Self {
        Self {
            id: id!(64),
            topic_id,
            board_id,
            subject: subject.to_string(),
            body: body.to_string(),
            poster_id,
            poster_name: poster_name.to_string(),
            poster_email: poster_email.to_string(),
            approved,
            ip,
            created_at: utc_now!(),
        }
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn get(id: u64) -> MailBoardResult<Option<Post>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    pub async fn list_by_topic(topic_id: u64) -> MailBoardResult<Vec<Post>> {
        filter_by_secondary_key_impl(DB_MANAGER.meta_db(), PostKey::topic_id, topic_id).await
    }
}
