//! Test-only payment shortcut.
//!
//! Marks a booking paid without a payment provider round-trip, bypassing the
//! status state machine. Disabled unless `ENABLE_TEST_PAYMENTS` is set, and
//! every call must present `TEST_PAYMENT_SECRET`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use subtle::ConstantTimeEq;

use detailr_core::BookingId;

use crate::app::errors;
use crate::app::services::AppServices;

pub const SECRET_HEADER: &str = "x-test-payment-secret";

pub fn router() -> Router {
    Router::new().route("/bookings/:id/mark-paid", post(mark_paid))
}

pub async fn mark_paid(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !services.config.enable_test_payments {
        return errors::json_error(StatusCode::NOT_FOUND, "Not found");
    }
    let expected = match services.config.require_test_payment_secret() {
        Ok(secret) => secret,
        Err(e) => return errors::service_error_to_response(e.into()),
    };
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !presented.is_some_and(|p| secret_matches(p, expected)) {
        return errors::json_error(StatusCode::FORBIDDEN, "Forbidden: invalid test payment secret");
    }

    let id = match errors::parse_id::<BookingId>(&id, "booking id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.bookings.mark_paid_for_testing(id).await {
        Ok(update) => (StatusCode::OK, Json(json!({ "data": update }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Compare without short-circuiting on the first differing byte.
fn secret_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
