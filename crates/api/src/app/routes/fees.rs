use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use detailr_auth::require_user;
use detailr_core::{DetailerId, Money, Percentage};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new().route("/preview", get(preview))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePreviewQuery {
    pub amount: Option<String>,
    pub detailer_id: Option<String>,
    pub fee_percentage: Option<f64>,
}

/// Fee/payout split for an amount, using the detailer's tier unless overridden.
pub async fn preview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(q): Query<FeePreviewQuery>,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let Some(raw_amount) = q.amount.as_deref() else {
        return errors::bad_request("Missing required field: amount");
    };
    let amount = match Money::parse_decimal(raw_amount) {
        Ok(m) => m,
        Err(e) => return errors::bad_request(e.to_string()),
    };
    let detailer_id = match q.detailer_id.as_deref().map(|raw| errors::parse_id::<DetailerId>(raw, "detailerId")) {
        Some(Ok(id)) => Some(id),
        Some(Err(resp)) => return resp,
        None => None,
    };
    let override_percentage = match q.fee_percentage.map(Percentage::from_percent) {
        Some(Ok(p)) => Some(p),
        Some(Err(e)) => return errors::bad_request(e.to_string()),
        None => None,
    };

    match services.fees.calculate(amount, detailer_id, override_percentage).await {
        Ok(breakdown) => (StatusCode::OK, Json(json!({ "data": breakdown }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
