// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use board::BoardApi;
use failure::FailureApi;
use gateway::GatewayApi;
use member::MemberApi;
use poem_openapi::{OpenApiService, Tags};
use system::SystemApi;

use crate::mailboard_version;

pub mod board;
pub mod failure;
pub mod gateway;
pub mod member;
pub mod system;

#[derive(Tags)]
pub enum ApiTags {
    Gateway,
    Failure,
    Board,
    Member,
    System,
}

type MailBoardOpenApi = (GatewayApi, FailureApi, BoardApi, MemberApi, SystemApi);

pub fn create_openapi_service() -> OpenApiService<MailBoardOpenApi, ()> {
    OpenApiService::new(
        (GatewayApi, FailureApi, BoardApi, MemberApi, SystemApi),
        "MailBoardApi",
        mailboard_version!(),
    )
}
