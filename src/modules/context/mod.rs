// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailBoardResult;

pub mod status;

pub trait Initialize {
    async fn initialize() -> MailBoardResult<()>;
}

pub trait MailBoardTask {
    fn start();
}
