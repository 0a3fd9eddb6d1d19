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
#[native_model(id = 7, version = 1)]
#[native_db]
pub struct PmMessage {
    /// The unique identifier of this private message.
    #[primary_key]
    pub id: u64,

    /// Id of the first message in the conversation; equals `id` for thread heads.
    #[secondary_key]
    pub thread_head_id: u64,

    pub sender_id: u64,
    pub sender_name: String,
    pub recipient_id: u64,

    pub subject: String,

    /// Message body in forum markup.
    pub body: String,

    /// Read marker for the recipient's mailbox.
    pub read: bool,

    /// Set on the originating message once a reply has been sent.
    pub replied: bool,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl PmMessage {
    pub fn new(
        thread_head_id: Option<u64>,
        sender_id: u64,
        sender_name: &str,
        recipient_id: u64,
        subject: &str,
        body: &str,
    ) -> Self {
        let id = id!(64);
        Self {
            id,
            thread_head_id: thread_head_id.unwrap_or(id),
            sender_id,
            sender_name: sender_name.to_string(),
            recipient_id,
            subject: subject.to_string(),
            body: body.to_string(),
            read: false,
            replied: false,
            created_at: utc_now!(),
        }
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn get(id: u64) -> MailBoardResult<Option<PmMessage>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    pub async fn list_thread(thread_head_id: u64) -> MailBoardResult<Vec<PmMessage>> {
        filter_by_secondary_key_impl(
            DB_MANAGER.meta_db(),
            PmMessageKey::thread_head_id,
            thread_head_id,
        )
        .await
    }

    /// Marks the originating message read and replied once the email reply
    /// has been persisted.
    pub async fn mark_read_replied(id: u64) -> MailBoardResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<PmMessage>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Private message with id={} not found", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.read = true;
                updated.replied = true;
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}
