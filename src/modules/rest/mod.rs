// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::common::auth::ApiGuard;
use crate::modules::common::error::ErrorCapture;
use crate::modules::common::log::Tracing;
use crate::modules::common::signal::shutdown_signal;
use crate::modules::common::timeout::{Timeout, TIMEOUT_HEADER};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::handler::error_handler;
use crate::modules::error::{ApiErrorResponse, MailBoardResult};
use crate::modules::rest::public::status::get_status;
use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;

use api::create_openapi_service;
use poem::get;
use poem::listener::TcpListener;
use poem::middleware::{CatchPanic, Compression};
use poem::{middleware::Cors, EndpointExt, Route, Server};
use poem_openapi::ContactObject;
use std::time::Duration;

pub mod api;
pub mod public;
pub mod response;

pub type ApiResult<T, E = ApiErrorResponse> = std::result::Result<T, E>;

const DESCRIPTION: &str = r#"
    MailBoard is a self-hosted email-to-forum gateway for communities that want their discussions reachable by plain email.

    - Turns inbound replies, keyed plus-addresses, and board addresses into forum posts, topics, and private messages.
    - Applies per-member permission matrices, moderation holds, and spam/bounce policies before anything is persisted.
    - Keeps every rejected email reviewable and retryable from the admin API.

    Point your MTA's spool at it, or push raw messages over the REST API.
"#;

pub async fn start_http_server() -> MailBoardResult<()> {
    let listener = TcpListener::bind((
        SETTINGS
            .mailboard_bind_ip
            .clone()
            .unwrap_or("0.0.0.0".into()),
        SETTINGS.mailboard_http_port as u16,
    ));

    let api_service = create_openapi_service()
        .description(DESCRIPTION)
        .contact(ContactObject::new().email("support@mailboard.dev"))
        .summary("A self-hosted email-to-forum posting gateway");

    let swagger = api_service.swagger_ui();
    let redoc = api_service.redoc();
    let scalar = api_service.scalar();
    let spec_json = api_service.spec_endpoint();
    let spec_yaml = api_service.spec_endpoint_yaml();
    let openapi_explorer = api_service.openapi_explorer();

    let open_api_route = Route::new()
        .nest_no_strip("/api/v1", api_service)
        .with(ApiGuard)
        .with(ErrorCapture)
        .with(Timeout)
        .with(Tracing);

    let mut cors_origins = SETTINGS.mailboard_cors_origins.clone();
    if cors_origins.is_empty() {
        cors_origins = ["*".to_string()].into_iter().collect();
    }

    let cors = Cors::new()
        .allow_origins(cors_origins)
        .allow_credentials(true)
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS", "HEAD"])
        .allow_headers(vec!["Content-Type", "Authorization", TIMEOUT_HEADER])
        .expose_headers(vec!["Accept"])
        .max_age(SETTINGS.mailboard_cors_max_age);

    let route = Route::new()
        .nest("/api-docs/swagger", swagger)
        .nest("/api-docs/redoc", redoc)
        .nest("/api-docs/explorer", openapi_explorer)
        .nest("/api-docs/scalar", scalar)
        .nest("/api-docs/spec.json", spec_json)
        .nest("/api-docs/spec.yaml", spec_yaml)
        .nest("/api/status", get(get_status))
        .nest_no_strip("/api/v1", open_api_route)
        .with(cors)
        .with_if(
            SETTINGS.mailboard_http_compression_enabled,
            Compression::new(),
        )
        .with(CatchPanic::new());

    let server = Server::new(listener)
        .name("MailBoard API Service")
        .idle_timeout(Duration::from_secs(60))
        .run_with_graceful_shutdown(
            route.catch_all_error(error_handler),
            shutdown_signal(),
            Some(Duration::from_secs(5)),
        );
    println!(
        "MailBoard API Service is now running on port {}.",
        SETTINGS.mailboard_http_port
    );
    server
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
}
