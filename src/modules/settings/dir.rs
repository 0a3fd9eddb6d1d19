// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::context::Initialize;
use crate::modules::settings::cli::SETTINGS;
use crate::{
    modules::error::{code::ErrorCode, MailBoardResult},
    raise_error,
};
use std::path::PathBuf;
use std::sync::LazyLock;

pub const META_FILE: &str = "meta.db";
const LOG_DIR: &str = "logs";
const SPOOL_INCOMING_DIR: &str = "spool/incoming";
const SPOOL_PROCESSED_DIR: &str = "spool/processed";
const SPOOL_REJECTED_DIR: &str = "spool/rejected";

pub static DATA_DIR_MANAGER: LazyLock<DataDirManager> =
    LazyLock::new(|| DataDirManager::new(PathBuf::from(&SETTINGS.mailboard_root_dir)));

#[derive(Debug)]
pub struct DataDirManager {
    pub root_dir: PathBuf,
    pub meta_db: PathBuf,
    pub log_dir: PathBuf,
    pub spool_incoming: PathBuf,
    pub spool_processed: PathBuf,
    pub spool_rejected: PathBuf,
}

impl Initialize for DataDirManager {
    async fn initialize() -> MailBoardResult<()> {
        std::fs::create_dir_all(&DATA_DIR_MANAGER.root_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.log_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_incoming)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_processed)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.spool_rejected)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(())
    }
}

impl DataDirManager {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir: root_dir.clone(),
            meta_db: root_dir.join(META_FILE),
            log_dir: root_dir.join(LOG_DIR),
            spool_incoming: root_dir.join(SPOOL_INCOMING_DIR),
            spool_processed: root_dir.join(SPOOL_PROCESSED_DIR),
            spool_rejected: root_dir.join(SPOOL_REJECTED_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn spool_paths_live_under_the_root() {
        let temp_dir = tempdir().unwrap();
        let manager = DataDirManager::new(temp_dir.path().to_path_buf());

        assert!(manager.meta_db.ends_with("meta.db"));
        assert!(manager.spool_incoming.starts_with(temp_dir.path()));
        assert!(manager.spool_rejected.ends_with("spool/rejected"));
    }
}
