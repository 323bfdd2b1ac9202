//! Detailer dashboard.

use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::get};
use chrono::Utc;
use serde_json::json;

use detailr_auth::require_detailer;
use detailr_marketplace::{BookingFilters, BookingStatus};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

const UPCOMING_LIMIT: usize = 20;

pub fn router() -> Router {
    Router::new().route("/dashboard", get(dashboard))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
) -> axum::response::Response {
    if let Err(e) = require_detailer(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let context = match services.organization.context(identity.get()).await {
        Ok(ctx) => ctx,
        Err(e) => return errors::service_error_to_response(e),
    };

    let upcoming = BookingFilters::default()
        .with_statuses([
            BookingStatus::Paid,
            BookingStatus::Offered,
            BookingStatus::Accepted,
            BookingStatus::InProgress,
        ])
        .between(Some(Utc::now().date_naive()), None)
        .limit(UPCOMING_LIMIT);
    let upcoming = match services.organization.scope_bookings(identity.get(), upcoming).await {
        Ok(f) => f,
        Err(e) => return errors::service_error_to_response(e),
    };
    let bookings = match services.bookings.list_bookings(&upcoming).await {
        Ok(rows) => rows,
        Err(e) => return errors::service_error_to_response(e),
    };

    Json(json!({
        "data": {
            "context": context,
            "upcoming": bookings,
        }
    }))
    .into_response()
}
