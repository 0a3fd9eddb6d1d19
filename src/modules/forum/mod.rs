// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod attachment;
pub mod board;
pub mod pm;
pub mod post;
pub mod topic;
