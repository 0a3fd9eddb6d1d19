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
            update_impl,
        },
        error::{code::ErrorCode, MailBoardResult},
    },
    raise_error, utc_now,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 5, version = 1)]
#[native_db]
pub struct Topic {
    /// The unique identifier of this topic.
    #[primary_key]
    pub id: u64,

    /// The board this topic lives on.
    #[secondary_key]
    pub board_id: u64,

    /// Topic subject without any reply prefix.
    pub subject: String,

    /// Member who started the topic.
    pub starter_id: u64,

    /// Display name of the starter, denormalized for listings.
    pub starter_name: String,

    /// Locked topics only accept replies from members with board moderation.
    pub locked: bool,

    /// Unapproved topics are invisible until a moderator approves them.
    pub approved: bool,

    /// Number of replies (excluding the opening post).
    pub reply_count: u64,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,

    /// The last update timestamp of this record, represented as milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl Topic {
    pub fn new(board_id: u64, subject: &str, starter_id: u64, starter_name: &str) -> Self {
        Self {
            id: id!(64),
            board_id,
            subject: subject.trim().to_string(),
            starter_id,
            starter_name: starter_name.to_string(),
            locked: false,
            approved: true,
            reply_count: 0,
            created_at: utc_now!(),
            updated_at: utc_now!(),
        }
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn get(id: u64) -> MailBoardResult<Option<Topic>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    pub async fn list_by_board(board_id: u64) -> MailBoardResult<Vec<Topic>> {
        filter_by_secondary_key_impl(DB_MANAGER.meta_db(), TopicKey::board_id, board_id).await
    }

    pub async fn record_reply(id: u64) -> MailBoardResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<Topic>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Topic with id={} not found", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.reply_count += 1;
                updated.updated_at = utc_now!();
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}
