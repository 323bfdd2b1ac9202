//! Admin pages: overview and user role management.
//!
//! The route guard has already redirected non-admins away from `/admin`;
//! handlers still run the admin check so they stay safe if mounted elsewhere.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use detailr_auth::UserRole;
use detailr_core::ProfileId;
use detailr_infra::Page;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub const USERS_PAGE: &str = "/admin/users";

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/", get(overview))
        .route("/users", get(list_users))
        .route("/users/:id/role", post(update_user_role))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> axum::response::Response {
    let users = match services.admin.list_users(identity.get(), None).await {
        Ok(u) => u,
        Err(e) => return errors::service_error_to_response(e),
    };
    let refunds = match services.admin.pending_refunds(identity.get(), Page::default()).await {
        Ok(r) => r,
        Err(e) => return errors::service_error_to_response(e),
    };

    let count = |role: UserRole| users.iter().filter(|u| u.role == role).count();
    Json(json!({
        "data": {
            "users": {
                "total": users.len(),
                "customers": count(UserRole::Customer),
                "detailers": count(UserRole::Detailer),
                "admins": count(UserRole::Admin),
            },
            "pending_refunds": refunds.len(),
        }
    }))
    .into_response()
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(q): Query<UsersQuery>,
) -> axum::response::Response {
    let role = match q.role.as_deref().filter(|r| !r.is_empty()).map(str::parse::<UserRole>) {
        Some(Ok(role)) => Some(role),
        Some(Err(e)) => return errors::bad_request(e.to_string()),
        None => None,
    };
    match services.admin.list_users(identity.get(), role).await {
        Ok(users) => (StatusCode::OK, Json(json!({ "data": users }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Form action; answers with a 303 back to the user list.
pub async fn update_user_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    Form(form): Form<RoleForm>,
) -> axum::response::Response {
    let user = match errors::parse_id::<ProfileId>(&id, "user id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let role = match form.role.parse::<UserRole>() {
        Ok(r) => r,
        Err(e) => return errors::bad_request(e.to_string()),
    };
    match services.admin.update_user_role(identity.get(), user, role).await {
        Ok(_) => Redirect::to(USERS_PAGE).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
