//! Admin finance endpoints: payouts and refunds.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use detailr_core::RefundId;
use detailr_infra::Page;
use detailr_marketplace::RefundDecision;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub fn router() -> Router {
    Router::new()
        .route("/payouts", get(list_payouts))
        .route("/refunds", get(list_pending_refunds))
        .route("/refunds/:id", post(process_refund))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

pub async fn list_payouts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(q): Query<PageQuery>,
) -> axum::response::Response {
    match services.admin.payouts(identity.get(), q.page()).await {
        Ok(rows) => (StatusCode::OK, Json(json!({ "data": rows }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_pending_refunds(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(q): Query<PageQuery>,
) -> axum::response::Response {
    match services.admin.pending_refunds(identity.get(), q.page()).await {
        Ok(rows) => (StatusCode::OK, Json(json!({ "data": rows }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn process_refund(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    body: Result<Json<RefundDecision>, JsonRejection>,
) -> axum::response::Response {
    let Ok(Json(decision)) = body else {
        return errors::bad_request("Missing required field: approve");
    };
    let id = match errors::parse_id::<RefundId>(&id, "refund id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.admin.process_refund(identity.get(), id, &decision).await {
        Ok(refund) => (StatusCode::OK, Json(json!({ "data": refund }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
