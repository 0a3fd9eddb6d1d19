// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::param::Query;
use poem_openapi::payload::{Binary, Json};
use poem_openapi::{Enum, Object, OpenApi};

use crate::modules::common::auth::ClientContext;
use crate::modules::error::code::ErrorCode;
use crate::modules::gateway::failure::FailureKind;
use crate::modules::gateway::{
    CreatedKind, EmailGateway, EmailPreview, GatewayConfig, IngestOutcome,
};
use crate::modules::key::PostingKey;
use crate::modules::member::Member;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::raise_error;

pub struct GatewayApi;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Enum)]
pub enum IngestStatus {
    Created,
    Rejected,
    Ignored,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Enum)]
pub enum CreatedContent {
    Reply,
    Topic,
    PrivateMessage,
}

/// Wire form of a gateway outcome.
#[derive(Clone, Debug, PartialEq, Object)]
pub struct IngestResponse {
    pub status: IngestStatus,
    /// Set when `status` is `Created`.
    pub created: Option<CreatedContent>,
    /// Id of the created post, topic, or private message.
    pub created_id: Option<u64>,
    /// Set when `status` is `Rejected`.
    pub failure: Option<FailureKind>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Created { kind, id } => IngestResponse {
                status: IngestStatus::Created,
                created: Some(match kind {
                    CreatedKind::Reply => CreatedContent::Reply,
                    CreatedKind::Topic => CreatedContent::Topic,
                    CreatedKind::PrivateMessage => CreatedContent::PrivateMessage,
                }),
                created_id: Some(id),
                failure: None,
            },
            IngestOutcome::Rejected(kind) => IngestResponse {
                status: IngestStatus::Rejected,
                created: None,
                created_id: None,
                failure: Some(kind),
            },
            IngestOutcome::Ignored => IngestResponse {
                status: IngestStatus::Ignored,
                created: None,
                created_id: None,
                failure: None,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Object)]
pub struct PostingKeyRequest {
    pub member_id: u64,
    /// What the key may create on redemption; must carry an address tag,
    /// so `Unknown` and `NewTopicByAddress` are rejected.
    pub message_type: crate::modules::email::MessageType,
    /// Reply target: message id or private message id.
    pub target_id: u64,
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Gateway")]
impl GatewayApi {
    /// Feeds one raw RFC 5322 message through the keyed ingest flow.
    ///
    /// With `force=true` the spam flag, a consumed key, and the sender
    /// cross-check are overridden; intended for admin retries.
    #[oai(path = "/gateway/ingest", method = "post", operation_id = "ingest_email")]
    async fn ingest_email(
        &self,
        raw: Binary<Vec<u8>>,
        /// Override spam and key checks. Requires root.
        force: Query<Option<bool>>,
        context: ClientContext,
    ) -> ApiResult<Json<IngestResponse>> {
        let force = force.0.unwrap_or(false);
        if force {
            context.require_root()?;
        }
        let acting_admin = context.require_root().is_ok();
        let gateway = EmailGateway::new(GatewayConfig::load()?, acting_admin);
        let outcome = gateway.reply_or_new_topic_by_key(&raw.0, force).await?;
        Ok(Json(outcome.into()))
    }

    /// Feeds one raw message through the new-topic-by-address flow.
    #[oai(
        path = "/gateway/ingest-by-address",
        method = "post",
        operation_id = "ingest_email_by_address"
    )]
    async fn ingest_email_by_address(
        &self,
        raw: Binary<Vec<u8>>,
        context: ClientContext,
    ) -> ApiResult<Json<IngestResponse>> {
        let acting_admin = context.require_root().is_ok();
        let gateway = EmailGateway::new(GatewayConfig::load()?, acting_admin);
        let outcome = gateway.new_topic_by_address(&raw.0).await?;
        Ok(Json(outcome.into()))
    }

    /// Renders the transformed body of a raw message without persisting
    /// anything. Moderation tooling uses this to show what an email would
    /// have posted.
    #[oai(path = "/gateway/preview", method = "post", operation_id = "preview_email")]
    async fn preview_email(&self, raw: Binary<Vec<u8>>) -> ApiResult<Json<EmailPreview>> {
        let gateway = EmailGateway::new(GatewayConfig::load()?, false);
        Ok(Json(gateway.preview(&raw.0)))
    }

    /// Returns the active gateway configuration.
    #[oai(path = "/gateway/config", method = "get", operation_id = "get_gateway_config")]
    async fn get_config(&self) -> ApiResult<Json<GatewayConfig>> {
        Ok(Json(GatewayConfig::load()?))
    }

    /// Replaces the gateway configuration. Requires root permission.
    #[oai(path = "/gateway/config", method = "post", operation_id = "update_gateway_config")]
    async fn update_config(
        &self,
        config: Json<GatewayConfig>,
        context: ClientContext,
    ) -> ApiResult<()> {
        context.require_root()?;
        Ok(config.0.store().await?)
    }

    /// Issues a one-time posting key for an outbound notification email.
    /// Requires root permission.
    #[oai(path = "/posting-keys", method = "post", operation_id = "issue_posting_key")]
    async fn issue_posting_key(
        &self,
        request: Json<PostingKeyRequest>,
        context: ClientContext,
    ) -> ApiResult<Json<PostingKey>> {
        context.require_root()?;
        if request.0.message_type.tag().is_none() {
            return Err(raise_error!(
                "message_type must be a reply type".into(),
                ErrorCode::InvalidParameter
            )
            .into());
        }
        let member = Member::get(request.0.member_id).await?.ok_or_else(|| {
            raise_error!(
                format!("Member with id={} not found", request.0.member_id),
                ErrorCode::ResourceNotFound
            )
        })?;
        let key = PostingKey::issue(&member, request.0.message_type, request.0.target_id).await?;
        Ok(Json(key))
    }
}
