// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::MailBoardTask;
use crate::modules::tasks::clean::FailureCleanTask;
use crate::modules::tasks::spool::SpoolIngestTask;

pub mod clean;
pub mod spool;

pub struct PeriodicTasks;

impl PeriodicTasks {
    pub fn start_background_tasks() {
        SpoolIngestTask::start();
        FailureCleanTask::start();
    }
}
