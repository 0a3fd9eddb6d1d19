// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{
    error::{code::ErrorCode, MailBoardResult},
    settings::{cli::SETTINGS, system::SystemSetting},
    token::ROOT_TOKEN,
};
use crate::raise_error;

use poem::{
    web::{
        headers::{authorization::Bearer, Authorization, HeaderMapExt},
        RealIp,
    },
    Endpoint, FromRequest, Middleware, Request, RequestBody, Result,
};
use serde::Deserialize;
use std::{net::IpAddr, sync::Arc};

use super::create_api_error_response;

pub struct ApiGuard;

pub struct ApiGuardEndpoint<E> {
    ep: E,
}

impl<E: Endpoint> Middleware<E> for ApiGuard {
    type Output = ApiGuardEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        ApiGuardEndpoint { ep }
    }
}

#[derive(Deserialize)]
struct Param {
    access_token: String,
}

impl<E: Endpoint> Endpoint for ApiGuardEndpoint<E> {
    type Output = E::Output;

    async fn call(&self, mut req: Request) -> Result<Self::Output> {
        let context = extract_client_context(&req).await?;
        context.require_root().map_err(|error| {
            create_api_error_response(&error.to_string(), ErrorCode::PermissionDenied)
        })?;
        req.set_data(Arc::new(context.clone()));
        self.ep.call(req).await
    }
}

/// Identity of the admin API caller. When the access-token mechanism is
/// disabled every caller counts as root (single-operator deployments).
#[derive(Clone, Debug, Default)]
pub struct ClientContext {
    pub ip_addr: Option<IpAddr>,
    pub is_root: bool,
}

impl ClientContext {
    pub fn require_root(&self) -> MailBoardResult<()> {
        if !SETTINGS.mailboard_enable_access_token || self.is_root {
            Ok(())
        } else {
            Err(raise_error!(
                "Root access required".into(),
                ErrorCode::PermissionDenied
            ))
        }
    }
}

impl<'a> FromRequest<'a> for ClientContext {
    async fn from_request(req: &'a Request, _body: &mut RequestBody) -> Result<Self> {
        extract_client_context(req).await
    }
}

pub async fn extract_client_context(req: &Request) -> Result<ClientContext> {
    if SETTINGS.mailboard_enable_access_token {
        let ip_addr = RealIp::from_request_without_body(req)
            .await
            .ok()
            .and_then(|real_ip| real_ip.0);

        // Extract the token from the Bearer header or query params
        let bearer = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.0.token().to_string())
            .or_else(|| req.params::<Param>().ok().map(|param| param.access_token));

        let token = bearer.ok_or_else(|| {
            create_api_error_response("Valid access token not found", ErrorCode::PermissionDenied)
        })?;

        if let Ok(Some(root)) = SystemSetting::get(ROOT_TOKEN) {
            if root.value == token {
                return Ok(ClientContext {
                    ip_addr,
                    is_root: true,
                });
            }
        }

        return Err(create_api_error_response(
            "Invalid access token",
            ErrorCode::PermissionDenied,
        ));
    }

    Ok(Default::default())
}
