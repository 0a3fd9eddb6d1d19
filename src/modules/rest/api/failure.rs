// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use serde::{Deserialize, Serialize};

use crate::modules::common::auth::ClientContext;
use crate::modules::error::code::ErrorCode;
use crate::modules::gateway::failure::{FailureKind, FailureRecord};
use crate::modules::gateway::{EmailGateway, GatewayConfig};
use crate::modules::rest::api::gateway::IngestResponse;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::response::DataPage;
use crate::modules::rest::ApiResult;
use crate::raise_error;

pub struct FailureApi;

/// List form of a failure record; the raw payload stays server-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct FailureSummary {
    pub id: String,
    pub kind: FailureKind,
    pub message: String,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub created_at: i64,
}

impl From<FailureRecord> for FailureSummary {
    fn from(record: FailureRecord) -> Self {
        FailureSummary {
            id: record.id,
            kind: record.kind,
            message: record.message,
            sender: record.sender,
            recipient: record.recipient,
            subject: record.subject,
            created_at: record.created_at,
        }
    }
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Failure")]
impl FailureApi {
    /// Lists rejected inbound emails, newest first by default.
    #[oai(path = "/failures", method = "get", operation_id = "list_failures")]
    async fn list_failures(
        &self,
        /// The page number to retrieve (1-based).
        page: Query<Option<u64>>,
        /// The number of items per page.
        page_size: Query<Option<u64>>,
        /// Whether to sort in descending order.
        desc: Query<Option<bool>>,
    ) -> ApiResult<Json<DataPage<FailureSummary>>> {
        let paginated = FailureRecord::paginate_list(page.0, page_size.0, desc.0).await?;
        Ok(Json(DataPage::new(
            paginated.page,
            paginated.page_size,
            paginated.total_items,
            paginated.total_pages,
            paginated.items.into_iter().map(Into::into).collect(),
        )))
    }

    /// Retrieves a single failure record.
    #[oai(path = "/failures/:id", method = "get", operation_id = "get_failure")]
    async fn get_failure(&self, id: Path<String>) -> ApiResult<Json<FailureSummary>> {
        let record = FailureRecord::get(&id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Failure record '{}' not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(record.into()))
    }

    /// Re-runs the stored raw email through the gateway with the force
    /// override, then deletes the record if content was created. Requires
    /// root permission.
    #[oai(path = "/failures/:id/retry", method = "post", operation_id = "retry_failure")]
    async fn retry_failure(
        &self,
        id: Path<String>,
        context: ClientContext,
    ) -> ApiResult<Json<IngestResponse>> {
        context.require_root()?;
        let record = FailureRecord::get(&id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Failure record '{}' not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;

        let gateway = EmailGateway::new(GatewayConfig::load()?, true);
        let outcome = gateway.ingest(&record.raw, true).await?;
        if matches!(outcome, crate::modules::gateway::IngestOutcome::Created { .. }) {
            FailureRecord::delete(&id.0).await?;
        }
        Ok(Json(outcome.into()))
    }

    /// Deletes a failure record. Requires root permission.
    #[oai(path = "/failures/:id", method = "delete", operation_id = "delete_failure")]
    async fn delete_failure(&self, id: Path<String>, context: ClientContext) -> ApiResult<()> {
        context.require_root()?;
        Ok(FailureRecord::delete(&id.0).await?)
    }
}
