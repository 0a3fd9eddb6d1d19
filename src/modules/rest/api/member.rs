// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi};
use serde::{Deserialize, Serialize};

use crate::modules::common::auth::ClientContext;
use crate::modules::error::code::ErrorCode;
use crate::modules::member::Member;
use crate::modules::permission::Permission;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::response::DataPage;
use crate::modules::rest::ApiResult;
use crate::raise_error;

pub struct MemberApi;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct MemberCreateRequest {
    pub email: String,
    pub display_name: String,
    pub is_admin: Option<bool>,
    pub permissions: Option<Vec<Permission>>,
    /// Preferred language tag for localized reply prefixes, e.g. `de`.
    pub language: Option<String>,
}

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Member")]
impl MemberApi {
    /// Creates a member. Requires root permission.
    #[oai(path = "/members", method = "post", operation_id = "create_member")]
    async fn create_member(
        &self,
        request: Json<MemberCreateRequest>,
        context: ClientContext,
    ) -> ApiResult<Json<Member>> {
        context.require_root()?;
        let mut member = Member::new(&request.0.email, &request.0.display_name);
        member.is_admin = request.0.is_admin.unwrap_or(false);
        member.permissions = request.0.permissions.unwrap_or_default();
        member.language = request.0.language;
        member.save().await?;
        Ok(Json(member))
    }

    /// Lists members.
    #[oai(path = "/members", method = "get", operation_id = "list_members")]
    async fn list_members(
        &self,
        /// The page number to retrieve (1-based).
        page: Query<Option<u64>>,
        /// The number of items per page.
        page_size: Query<Option<u64>>,
        /// Whether to sort in descending order.
        desc: Query<Option<bool>>,
    ) -> ApiResult<Json<DataPage<Member>>> {
        let paginated = Member::paginate_list(page.0, page_size.0, desc.0).await?;
        Ok(Json(paginated.into()))
    }

    /// Retrieves a single member.
    #[oai(path = "/members/:id", method = "get", operation_id = "get_member")]
    async fn get_member(&self, id: Path<u64>) -> ApiResult<Json<Member>> {
        let member = Member::get(id.0).await?.ok_or_else(|| {
            raise_error!(
                format!("Member with id={} not found", id.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(member))
    }

    /// Looks a member up by email address, case-insensitively.
    #[oai(path = "/members/by-email", method = "get", operation_id = "find_member_by_email")]
    async fn find_member_by_email(&self, email: Query<String>) -> ApiResult<Json<Member>> {
        let member = Member::find_by_email(&email.0).await?.ok_or_else(|| {
            raise_error!(
                format!("No member for address '{}'", email.0),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(member))
    }
}
