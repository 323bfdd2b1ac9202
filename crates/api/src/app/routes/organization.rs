use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use detailr_auth::OrgRole;
use detailr_core::ProfileId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_context))
        .route("/members", get(list_members))
        .route("/members/:profile_id", axum::routing::delete(remove_member))
        .route("/members/:profile_id/role", post(change_member_role))
}

pub async fn get_context(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> axum::response::Response {
    match services.organization.context(identity.get()).await {
        Ok(ctx) => (StatusCode::OK, Json(json!({ "data": ctx }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> axum::response::Response {
    match services.organization.members(identity.get()).await {
        Ok((organization, members)) => (
            StatusCode::OK,
            Json(json!({ "data": { "organization": organization, "members": members } })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

pub async fn change_member_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(profile_id): Path<String>,
    body: Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(Json(body)) = body else {
        return errors::bad_request("Missing required field: role");
    };
    let role = match body.role.parse::<OrgRole>() {
        Ok(r) => r,
        Err(e) => return errors::bad_request(e.to_string()),
    };
    let member = match errors::parse_id::<ProfileId>(&profile_id, "profile id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .organization
        .change_member_role(identity.get(), member, role)
        .await
    {
        Ok(updated) => (StatusCode::OK, Json(json!({ "data": updated }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(profile_id): Path<String>,
) -> axum::response::Response {
    let member = match errors::parse_id::<ProfileId>(&profile_id, "profile id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.organization.remove_member(identity.get(), member).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
