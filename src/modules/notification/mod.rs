// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! Notification bookkeeping. The gateway only writes `PendingNotification`
//! rows; an external sender drains them and builds the outbound emails
//! (issuing fresh posting keys for their reply addresses).

use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::Enum;
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    id,
    modules::{
        database::{
            delete_impl, filter_by_secondary_key_impl, insert_impl, list_all_impl,
            manager::DB_MANAGER,
        },
        error::{code::ErrorCode, MailBoardResult},
        member::Member,
    },
    raise_error, utc_now,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum NotificationKind {
    NewTopic,
    TopicReply,
    PmReceived,
}

/// A member watching a topic. Created automatically for topic starters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 9, version = 1)]
#[native_db]
pub struct Subscription {
    /// The unique identifier of this subscription.
    #[primary_key]
    pub id: u64,

    pub member_id: u64,

    /// The watched topic.
    #[secondary_key]
    pub target_id: u64,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl Subscription {
    pub async fn subscribe(member_id: u64, target_id: u64) -> MailBoardResult<()> {
        let existing = Self::subscribers(target_id).await?;
        if existing.iter().any(|s| s.member_id == member_id) {
            return Ok(());
        }
        let subscription = Subscription {
            id: id!(64),
            member_id,
            target_id,
            created_at: utc_now!(),
        };
        insert_impl(DB_MANAGER.meta_db(), subscription).await
    }

    pub async fn subscribers(target_id: u64) -> MailBoardResult<Vec<Subscription>> {
        filter_by_secondary_key_impl(DB_MANAGER.meta_db(), SubscriptionKey::target_id, target_id)
            .await
    }
}

/// One queued outbound notification, drained by the external sender.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 10, version = 1)]
#[native_db]
pub struct PendingNotification {
    /// The unique identifier of this notification.
    #[primary_key]
    pub id: u64,

    /// Member to notify.
    pub member_id: u64,

    /// The content that triggered the notification.
    pub target_id: u64,

    pub kind: NotificationKind,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl PendingNotification {
    pub async fn list_all() -> MailBoardResult<Vec<PendingNotification>> {
        list_all_impl(DB_MANAGER.meta_db()).await
    }

    pub async fn delete(id: u64) -> MailBoardResult<()> {
        delete_impl(DB_MANAGER.meta_db(), move |rw| {
            rw.get()
                .primary::<PendingNotification>(id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .ok_or_else(|| {
                    raise_error!(
                        format!("Notification with id={} not found", id),
                        ErrorCode::ResourceNotFound
                    )
                })
        })
        .await
    }
}

/// Queues notifications for every subscriber of the target, skipping the
/// member who caused the event and members whose notifications are disabled
/// (e.g. after a bounce).
pub async fn notify(
    target_id: u64,
    kind: NotificationKind,
    actor_member_id: u64,
) -> MailBoardResult<()> {
    for subscription in Subscription::subscribers(target_id).await? {
        if subscription.member_id == actor_member_id {
            continue;
        }
        let enabled = Member::get(subscription.member_id)
            .await?
            .map(|member| member.notifications_enabled)
            .unwrap_or(false);
        if !enabled {
            debug!(
                member_id = subscription.member_id,
                "skipping notification, delivery disabled"
            );
            continue;
        }
        let notification = PendingNotification {
            id: id!(64),
            member_id: subscription.member_id,
            target_id,
            kind,
            created_at: utc_now!(),
        };
        insert_impl(DB_MANAGER.meta_db(), notification).await?;
    }
    Ok(())
}

/// Queues a notification for one specific member, honoring the member's
/// delivery flag. Used for private messages, which have no subscriptions.
pub async fn queue_for_member(
    member_id: u64,
    target_id: u64,
    kind: NotificationKind,
) -> MailBoardResult<()> {
    let enabled = Member::get(member_id)
        .await?
        .map(|member| member.notifications_enabled)
        .unwrap_or(false);
    if !enabled {
        return Ok(());
    }
    let notification = PendingNotification {
        id: id!(64),
        member_id,
        target_id,
        kind,
        created_at: utc_now!(),
    };
    insert_impl(DB_MANAGER.meta_db(), notification).await
}

/// Bounce auto-disable: stop sending anything to this member until an
/// operator re-enables delivery.
pub async fn disable_for_member(member_id: u64) -> MailBoardResult<()> {
    Member::disable_notifications(member_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_members_are_skipped() {
        let watcher = Member::new("watcher@forum.example", "Watcher");
        watcher.save().await.unwrap();
        let silenced = Member::new("silenced@forum.example", "Silenced");
        silenced.save().await.unwrap();
        Member::disable_notifications(silenced.id).await.unwrap();

        let target_id = id!(64);
        Subscription::subscribe(watcher.id, target_id).await.unwrap();
        Subscription::subscribe(silenced.id, target_id).await.unwrap();

        notify(target_id, NotificationKind::TopicReply, 0)
            .await
            .unwrap();

        let pending = PendingNotification::list_all().await.unwrap();
        let for_target: Vec<_> = pending
            .iter()
            .filter(|n| n.target_id == target_id)
            .collect();
        assert_eq!(for_target.len(), 1);
        assert_eq!(for_target[0].member_id, watcher.id);
    }
}
