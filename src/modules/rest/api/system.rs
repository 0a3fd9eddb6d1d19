// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::payload::{Json, PlainText};
use poem_openapi::OpenApi;

use crate::modules::common::auth::ClientContext;
use crate::modules::context::status::MailBoardStatus;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::modules::token::reset_root_token;

pub struct SystemApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::System")]
impl SystemApi {
    /// Returns uptime and version information for this instance.
    #[oai(path = "/status", method = "get", operation_id = "get_system_status")]
    async fn get_system_status(&self) -> ApiResult<Json<MailBoardStatus>> {
        Ok(Json(MailBoardStatus::get()))
    }

    /// Generates a fresh root token, persists it, and returns it. The old
    /// token stops working immediately. Requires root permission.
    #[oai(path = "/reset-root-token", method = "post", operation_id = "reset_root_token")]
    async fn reset_root_token(&self, context: ClientContext) -> ApiResult<PlainText<String>> {
        context.require_root()?;
        Ok(PlainText(reset_root_token().await?))
    }

    /// Authenticates the caller's token.
    #[oai(path = "/login", method = "post", operation_id = "login")]
    async fn login(&self, context: ClientContext) -> ApiResult<()> {
        context.require_root()?;
        Ok(())
    }
}
