// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod common;
pub mod content;
pub mod context;
pub mod database;
pub mod email;
pub mod error;
pub mod forum;
pub mod gateway;
pub mod key;
pub mod lang;
pub mod logger;
pub mod markup;
pub mod member;
pub mod notification;
pub mod permission;
pub mod rest;
pub mod scheduler;
pub mod settings;
pub mod tasks;
pub mod token;
pub mod transform;
pub mod utils;
