use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use detailr_auth::AuthError;
use detailr_infra::ServiceError;

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const CONFIG_ERROR: &str = "Server configuration error";

/// Status and client-facing message for a service error.
///
/// Only authorization, not-found, validation and conflict errors carry their own
/// message; everything else is reported generically.
pub fn classify(err: &ServiceError) -> (StatusCode, String) {
    match err {
        ServiceError::Auth(e) => (auth_status(e), e.message().to_string()),
        ServiceError::NotFoundOrInaccessible => (StatusCode::NOT_FOUND, "Not found".to_string()),
        ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        ServiceError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, CONFIG_ERROR.to_string()),
        ServiceError::CommandFailed { .. } | ServiceError::Platform(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
        }
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let (status, message) = classify(&err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    json_error(status, message)
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    json_error(auth_status(&err), err.message())
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

/// Parse a path/query identifier, answering 400 on failure.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| bad_request(format!("invalid {what}: '{raw}'")))
}

fn auth_status(err: &AuthError) -> StatusCode {
    StatusCode::from_u16(err.status()).unwrap_or(StatusCode::FORBIDDEN)
}
