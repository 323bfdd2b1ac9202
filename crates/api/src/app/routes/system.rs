use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use detailr_auth::require_user;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(identity): Extension<RequestIdentity>) -> axum::response::Response {
    match require_user(identity.get()) {
        Ok(id) => Json(json!({
            "profile_id": id.profile_id,
            "role": id.role,
        }))
        .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Browser maps key, only handed to signed-in users.
pub async fn maps_config(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    match services.config.require_maps_api_key() {
        Ok(key) => Json(json!({ "data": { "maps_api_key": key } })).into_response(),
        Err(e) => errors::service_error_to_response(e.into()),
    }
}

/// Signed-in users never see this: the route guard sends them to their home page.
pub async fn login() -> axum::response::Response {
    Json(json!({ "message": "Sign in to continue" })).into_response()
}
