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
            async_find_impl, insert_impl, manager::DB_MANAGER,
            paginate_query_primary_scan_all_impl, secondary_find_impl, update_impl, Paginated,
        },
        error::{code::ErrorCode, MailBoardResult},
        permission::Permission,
    },
    raise_error, utc_now, validate_email,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct Member {
    /// The unique identifier of this member.
    #[primary_key]
    pub id: u64,

    /// Contact email, stored lowercased. Sender resolution is a
    /// case-insensitive lookup against this key.
    #[secondary_key(unique)]
    pub email: String,

    /// Display name shown on created content.
    pub display_name: String,

    /// Administrators bypass the permission matrices entirely.
    pub is_admin: bool,

    /// Capability grants consulted by the permission gate.
    pub permissions: Vec<Permission>,

    /// Whether outbound notifications are sent to this member. Cleared by
    /// bounce auto-disable.
    pub notifications_enabled: bool,

    /// When set and in the future, the member is under a temporary posting
    /// restriction: approved outcomes downgrade to pending.
    pub moderated_until: Option<i64>,

    /// Preferred language tag, e.g. `en`, `de`. Falls back to the forum
    /// default when absent.
    pub language: Option<String>,

    /// Number of counted posts.
    pub post_count: u64,

    /// Last activity timestamp in milliseconds since the Unix epoch.
    pub last_active_at: i64,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Member {
    pub fn new(email: &str, display_name: &str) -> Self {
        Self {
            id: id!(64),
            email: email.trim().to_lowercase(),
            display_name: display_name.trim().to_string(),
            is_admin: false,
            permissions: Vec::new(),
            notifications_enabled: true,
            moderated_until: None,
            language: None,
            post_count: 0,
            last_active_at: utc_now!(),
            created_at: utc_now!(),
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// True while a temporary posting restriction is active.
    pub fn is_moderated(&self, now: i64) -> bool {
        self.moderated_until.is_some_and(|until| until > now)
    }

    pub async fn save(&self) -> MailBoardResult<()> {
        validate_email!(&self.email)?;
        if self.display_name.is_empty() {
            return Err(raise_error!(
                "display_name must not be empty".into(),
                ErrorCode::InvalidParameter
            ));
        }
        insert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub async fn get(id: u64) -> MailBoardResult<Option<Member>> {
        async_find_impl(DB_MANAGER.meta_db(), id).await
    }

    /// Sender resolution — case-insensitive by construction, the stored key
    /// is always lowercase.
    pub async fn find_by_email(address: &str) -> MailBoardResult<Option<Member>> {
        secondary_find_impl(
            DB_MANAGER.meta_db(),
            MemberKey::email,
            address.trim().to_lowercase(),
        )
        .await
    }

    pub async fn paginate_list(
        page: Option<u64>,
        page_size: Option<u64>,
        desc: Option<bool>,
    ) -> MailBoardResult<Paginated<Member>> {
        paginate_query_primary_scan_all_impl(DB_MANAGER.meta_db(), page, page_size, desc).await
    }

    /// Stamps activity from email metadata; callers pass the message's
    /// `Date` when it carries one.
    pub async fn touch_last_active(id: u64, at: i64) -> MailBoardResult<()> {
        Self::modify(id, move |updated| {
            updated.last_active_at = at;
        })
        .await
    }

    pub async fn disable_notifications(id: u64) -> MailBoardResult<()> {
        Self::modify(id, |updated| {
            updated.notifications_enabled = false;
        })
        .await
    }

    pub async fn increment_post_count(id: u64) -> MailBoardResult<()> {
        Self::modify(id, |updated| {
            updated.post_count += 1;
        })
        .await
    }

    async fn modify(id: u64, apply: impl FnOnce(&mut Member) + Send + 'static) -> MailBoardResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<Member>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Member with id={} not found", id),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                apply(&mut updated);
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

    #[test]
    fn email_is_normalized_to_lowercase() {
        let member = Member::new("  Jane@Forum.Example ", "Jane");
        assert_eq!(member.email, "jane@forum.example");
    }

    #[test]
    fn moderation_window_expires() {
        let mut member = Member::new("jane@forum.example", "Jane");
        let now = utc_now!();
        member.moderated_until = Some(now + 60_000);
        assert!(member.is_moderated(now));
        assert!(!member.is_moderated(now + 120_000));
    }

    #[tokio::test]
    async fn find_by_email_is_case_insensitive() {
        let member = Member::new("case@forum.example", "Case");
        member.save().await.unwrap();

        let found = Member::find_by_email("CASE@Forum.Example").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(member.id));
    }
}
