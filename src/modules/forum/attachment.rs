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
        database::{filter_by_secondary_key_impl, insert_impl, manager::DB_MANAGER},
        email::EmailAttachment,
        error::MailBoardResult,
    },
    utc_now,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 8, version = 1)]
#[native_db]
pub struct Attachment {
    /// The unique identifier of this attachment.
    #[primary_key]
    pub id: u64,

    /// The post this attachment belongs to.
    #[secondary_key]
    pub post_id: u64,

    pub filename: String,
    pub mime_type: String,

    /// Size in bytes.
    pub size: u64,

    /// Raw content.
    pub data: Vec<u8>,

    /// Unapproved attachments are held with their post.
    pub approved: bool,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Attachment {
    pub fn from_email(post_id: u64, source: &EmailAttachment, approved: bool) -> Self {
        Self {
            id: id!(64),
            post_id,
            filename: source.filename.clone(),
            mime_type: source.mime_type.clone(),
            size: source.size,
            data: source.data.clone(),
            approved,
            created_at: utc_now!(),
        }
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn list_by_post(post_id: u64) -> MailBoardResult<Vec<Attachment>> {
        filter_by_secondary_key_impl(DB_MANAGER.meta_db(), AttachmentKey::post_id, post_id).await
    }
}
