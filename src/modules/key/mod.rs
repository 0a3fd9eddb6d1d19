// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::{
    generate_token,
    modules::{
        database::{async_find_impl, insert_impl, manager::DB_MANAGER, take_impl},
        email::MessageType,
        error::MailBoardResult,
        member::Member,
    },
    utc_now,
};

/// A one-time posting key. Embedded in the plus part of outbound reply
/// addresses; redeemable exactly once to authenticate an email reply without
/// a login. The key string is the primary key, so resolution is O(1).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct PostingKey {
    #[primary_key]
    pub key: String,

    /// Member the key was issued to.
    pub member_id: u64,

    /// Issued-to address, lowercased. The gateway cross-checks it against the
    /// actual sender.
    pub member_email: String,

    /// What a redemption of this key is allowed to create.
    pub message_type: MessageType,

    /// Reply target: message id or PM id, depending on `message_type`.
    pub target_id: u64,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl PostingKey {
    /// Issues a fresh key for an outbound notification email.
    pub async fn issue(
        member: &Member,
        message_type: MessageType,
        target_id: u64,
    ) -> MailBoardResult<PostingKey> {
        let posting_key = PostingKey {
            key: generate_token!(96),
            member_id: member.id,
            member_email: member.email.clone(),
            message_type,
            target_id,
            created_at: utc_now!(),
        };
        insert_impl(DB_MANAGER.meta_db(), posting_key.clone()).await?;
        Ok(posting_key)
    }

    /// O(1) owner lookup. A consumed or forged key resolves to `None`.
    pub async fn resolve(key: &str) -> MailBoardResult<Option<PostingKey>> {
        async_find_impl(DB_MANAGER.meta_db(), key.to_string()).await
    }

    /// Consumes the key. Idempotent: a second invalidation of the same key
    /// returns `false` instead of erroring, so duplicate SMTP delivery never
    /// surfaces as a failure. Get and remove share one rw transaction, so of
    /// two racing consumers exactly one observes `true`.
    pub async fn invalidate(key: &str) -> MailBoardResult<bool> {
        let taken: Option<PostingKey> = take_impl(DB_MANAGER.meta_db(), key.to_string()).await?;
        Ok(taken.is_some())
    }

    /// Renders the plus-addressed reply address for this key,
    /// e.g. `post+VRsGhmLkq3aF-m451@forum.example`.
    pub fn posting_address(&self, mailbox: &str, host: &str) -> Option<String> {
        let tag = self.message_type.tag()?;
        Some(format!(
            "{}+{}-{}{}@{}",
            mailbox, self.key, tag, self.target_id, host
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::email::parser;

    #[tokio::test]
    async fn invalidate_is_idempotent() {
        let member = Member::new("key-owner@forum.example", "Owner");
        let posting_key = PostingKey::issue(&member, MessageType::TopicReply, 7)
            .await
            .unwrap();

        assert!(PostingKey::resolve(&posting_key.key).await.unwrap().is_some());
        assert!(PostingKey::invalidate(&posting_key.key).await.unwrap());
        // Second consumption is a successful no-op.
        assert!(!PostingKey::invalidate(&posting_key.key).await.unwrap());
        assert!(PostingKey::resolve(&posting_key.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn posting_address_round_trips_through_the_parser() {
        let member = Member::new("round-trip@forum.example", "Round");
        let posting_key = PostingKey::issue(&member, MessageType::MessageReply, 451)
            .await
            .unwrap();
        let address = posting_key
            .posting_address("post", "forum.example")
            .unwrap();

        let raw = format!(
            "From: round-trip@forum.example\r\nTo: {address}\r\nSubject: Re: x\r\n\r\nbody\r\n"
        );
        let email = parser::parse(raw.as_bytes());
        assert_eq!(email.key, posting_key.key);
        assert_eq!(email.message_type, MessageType::MessageReply);
        assert_eq!(email.target_id, 451);
    }
}
