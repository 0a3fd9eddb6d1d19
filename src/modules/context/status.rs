// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::utc_now;
use chrono::Local;
use poem_openapi::Object;
use serde::Deserialize;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;
use timeago::Formatter;

static START_AT: LazyLock<i64> = LazyLock::new(|| utc_now!());

/// Pins the start timestamp. Called once from `main` before anything else
/// reads it.
pub fn mark_started() {
    LazyLock::force(&START_AT);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Object)]
pub struct MailBoardStatus {
    /// The service uptime in milliseconds since it started.
    pub uptime_ms: i64,
    /// A human-readable string indicating the time elapsed since the service started (e.g., "2 hours ago").
    pub timeago: String,
    /// The timezone in which the service is operating (e.g., "UTC" or "Asia/Tokyo").
    pub timezone: String,
    /// The version of the MailBoard service currently running.
    pub version: String,
}

impl MailBoardStatus {
    pub fn get() -> Self {
        let uptime_ms = utc_now!() - *START_AT;
        Self {
            uptime_ms,
            timeago: Formatter::new().convert(Duration::from_millis(uptime_ms.max(0) as u64)),
            timezone: Local::now().offset().to_string(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
