// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use tracing::info;

use crate::{
    modules::{
        context::MailBoardTask, gateway::failure::FailureRecord, scheduler::periodic::PeriodicTask,
        settings::cli::SETTINGS,
    },
    utc_now,
};

const TASK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Prunes failure records past the configured retention window.
pub struct FailureCleanTask;

impl MailBoardTask for FailureCleanTask {
    fn start() {
        let periodic_task = PeriodicTask::new("failure-record-cleaner");

        let task = move || {
            Box::pin(async move {
                let retention_ms = SETTINGS.mailboard_failure_retention_hours as i64 * 3_600_000;
                let cutoff = utc_now!() - retention_ms;
                let removed = FailureRecord::delete_older_than(cutoff).await?;
                if removed > 0 {
                    info!(removed, "expired failure records pruned");
                }
                Ok(())
            })
        };

        periodic_task.start(task, TASK_INTERVAL, false, false);
    }
}
