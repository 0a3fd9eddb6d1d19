// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    id,
    modules::{
        database::{
            async_find_impl, batch_delete_impl, delete_impl, insert_impl, manager::DB_MANAGER,
            paginate_query_primary_scan_all_impl, Paginated,
        },
        email::InboundEmail,
        error::{code::ErrorCode, MailBoardResult},
    },
    raise_error, utc_now,
};

/// Closed taxonomy of content-attributable ingest failures. Infrastructure
/// errors never land here — they propagate as `MailBoardError`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Enum)]
pub enum FailureKind {
    Bounced,
    FeatureDisabled,
    SpamDetected,
    MemberNotFound,
    MissingKey,
    KeyNotFound,
    SenderKeyMismatch,
    MaintenanceMode,
    TargetGone,
    PermissionDenied,
    TopicLocked,
    NoSubject,
    NoMessageBody,
    AttachmentRejected,
}

/// One rejected inbound email, kept for operator review and admin retry.
/// The gateway never deletes these; only the retention task and explicit
/// admin calls do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
#[native_model(id = 11, version = 1)]
#[native_db]
pub struct FailureRecord {
    /// Time-prefixed identifier so a primary scan lists records in arrival
    /// order.
    #[primary_key]
    pub id: String,

    pub kind: FailureKind,

    /// Operator-facing description, carries the PM-vs-topic wording.
    pub message: String,

    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub subject: Option<String>,

    /// The full raw payload, kept verbatim so the admin retry action can
    /// re-run the exact email.
    pub raw: Vec<u8>,

    /// The creation timestamp of this record, represented as milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl FailureRecord {
    pub async fn record(
        kind: FailureKind,
        message: &str,
        email: &InboundEmail,
        raw: &[u8],
    ) -> MailBoardResult<()> {
        let created_at = utc_now!();
        let record = FailureRecord {
            id: format!("{:013}-{}", created_at, id!(64)),
            kind,
            message: message.to_string(),
            sender: email.sender.address.clone(),
            recipient: email
                .recipients
                .first()
                .and_then(|addr| addr.address.clone()),
            subject: (!email.subject.is_empty()).then(|| email.subject.clone()),
            raw: raw.to_vec(),
            created_at,
        };
        warn!(kind = ?kind, sender = ?record.sender, message, "inbound email rejected");
        insert_impl(DB_MANAGER.meta_db(), record).await
    }

    pub async fn get(id: &str) -> MailBoardResult<Option<FailureRecord>> {
        async_find_impl(DB_MANAGER.meta_db(), id.to_string()).await
    }

    pub async fn paginate_list(
        page: Option<u64>,
        page_size: Option<u64>,
        desc: Option<bool>,
    ) -> MailBoardResult<Paginated<FailureRecord>> {
        paginate_query_primary_scan_all_impl(DB_MANAGER.meta_db(), page, page_size, desc).await
    }

    pub async fn delete(id: &str) -> MailBoardResult<()> {
        let id = id.to_string();
        delete_impl(DB_MANAGER.meta_db(), move |rw| {
            rw.get()
                .primary::<FailureRecord>(id.as_str())
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .ok_or_else(|| {
                    raise_error!(
                        format!("Failure record '{}' not found", id),
                        ErrorCode::ResourceNotFound
                    )
                })
        })
        .await
    }

    /// Retention pruning. Returns how many records were removed.
    pub async fn delete_older_than(cutoff: i64) -> MailBoardResult<usize> {
        batch_delete_impl(DB_MANAGER.meta_db(), move |rw| {
            let records: Vec<FailureRecord> = rw
                .scan()
                .primary()
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .all()
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .collect::<Result<Vec<FailureRecord>, _>>()
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            Ok(records
                .into_iter()
                .filter(|record| record.created_at < cutoff)
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sort_by_arrival_and_prune_by_age() {
        let email = InboundEmail::default();
        FailureRecord::record(FailureKind::SpamDetected, "spam", &email, b"raw-1")
            .await
            .unwrap();
        FailureRecord::record(FailureKind::MissingKey, "no key", &email, b"raw-2")
            .await
            .unwrap();

        let page = FailureRecord::paginate_list(None, None, None).await.unwrap();
        assert!(page.total_items >= 2);

        let removed = FailureRecord::delete_older_than(utc_now!() + 1)
            .await
            .unwrap();
        assert!(removed >= 2);
    }
}
