// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::modules::context::MailBoardTask;
use crate::modules::error::{code::ErrorCode, MailBoardResult};
use crate::modules::gateway::{EmailGateway, GatewayConfig, IngestOutcome};
use crate::modules::scheduler::periodic::PeriodicTask;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::settings::dir::DATA_DIR_MANAGER;
use crate::raise_error;

/// Scans the incoming spool for `.eml` files dropped by the MTA and feeds
/// them through the gateway. Every processed file leaves the incoming
/// directory, so a crash mid-scan at worst reprocesses a file — the one-time
/// posting keys make that harmless.
pub struct SpoolIngestTask;

impl MailBoardTask for SpoolIngestTask {
    fn start() {
        let interval = Duration::from_secs(SETTINGS.mailboard_spool_poll_interval_secs.max(5));
        let periodic_task = PeriodicTask::new("spool-ingest");

        let task = move || Box::pin(scan_spool());
        periodic_task.start(task, interval, false, true);
    }
}

async fn scan_spool() -> MailBoardResult<()> {
    let pattern = DATA_DIR_MANAGER.spool_incoming.join("*.eml");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| raise_error!("Spool path is not valid UTF-8".into(), ErrorCode::InternalError))?
        .to_string();

    let paths: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
        .flatten()
        .collect();

    if paths.is_empty() {
        return Ok(());
    }

    let config = GatewayConfig::load()?;
    let gateway = EmailGateway::new(config, false);
    for path in paths {
        if let Err(error) = ingest_file(&gateway, &path).await {
            // Leave the file in place; the next scan retries it.
            warn!(path = %path.display(), ?error, "spool file could not be processed");
        }
    }
    Ok(())
}

pub async fn ingest_file(gateway: &EmailGateway, path: &Path) -> MailBoardResult<IngestOutcome> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;

    let outcome = gateway.ingest(&raw, false).await?;

    let archive_dir = match outcome {
        IngestOutcome::Rejected(_) => &DATA_DIR_MANAGER.spool_rejected,
        IngestOutcome::Created { .. } | IngestOutcome::Ignored => &DATA_DIR_MANAGER.spool_processed,
    };
    archive(path, archive_dir).await?;

    info!(path = %path.display(), outcome = ?outcome, "spool file processed");
    Ok(outcome)
}

async fn archive(path: &Path, target_dir: &Path) -> MailBoardResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| raise_error!("Spool entry has no file name".into(), ErrorCode::InternalError))?;
    tokio::fs::rename(path, target_dir.join(file_name))
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreadable_spool_file_is_ignored_and_archived() {
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_incoming).unwrap();
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_processed).unwrap();
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_rejected).unwrap();

        let path = DATA_DIR_MANAGER.spool_incoming.join("garbage-test.eml");
        tokio::fs::write(&path, b"").await.unwrap();

        let gateway = EmailGateway::new(GatewayConfig::default(), false);
        let outcome = ingest_file(&gateway, &path).await.unwrap();

        assert_eq!(outcome, IngestOutcome::Ignored);
        assert!(!path.exists());
        assert!(DATA_DIR_MANAGER
            .spool_processed
            .join("garbage-test.eml")
            .exists());
    }
}
