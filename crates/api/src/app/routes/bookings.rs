use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;

use detailr_auth::{require_detailer, require_user};
use detailr_core::{BookingId, DetailerId, OrganizationId};
use detailr_infra::RequestKey;
use detailr_marketplace::{AvailabilityQuery, BookingFilters, BookingOrder, BookingStatus};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bookings))
        .route("/check-availability", post(check_availability))
        .route("/:id", get(get_booking))
        .route("/:id/status", post(update_status))
        .route("/:id/assign", post(assign_detailer))
        .route("/:id/accept", post(accept_booking))
        .route("/:id/cancel", post(cancel_booking))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub detailer_id: Option<String>,
    pub organization_id: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub order_by: Option<String>,
    pub ascending: Option<bool>,
}

impl ListBookingsQuery {
    fn into_filters(self) -> Result<BookingFilters, axum::response::Response> {
        let mut filters = BookingFilters::default().between(self.from_date, self.to_date);
        if let Some(raw) = self.status.as_deref() {
            let statuses = BookingFilters::parse_statuses(raw).map_err(|e| errors::bad_request(e.to_string()))?;
            filters = filters.with_statuses(statuses);
        }
        if let Some(raw) = self.detailer_id.as_deref() {
            filters = filters.for_detailer(errors::parse_id::<DetailerId>(raw, "detailerId")?);
        }
        if let Some(raw) = self.organization_id.as_deref() {
            filters = filters.for_organization(errors::parse_id::<OrganizationId>(raw, "organizationId")?);
        }
        if let Some(limit) = self.limit {
            filters = filters.limit(limit);
        }
        let order_by = match self.order_by.as_deref() {
            Some(raw) => raw
                .parse::<BookingOrder>()
                .map_err(|e| errors::bad_request(e.to_string()))?,
            None => BookingOrder::default(),
        };
        Ok(filters.order(order_by, self.ascending.unwrap_or(true)))
    }
}

pub async fn list_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Query(query): Query<ListBookingsQuery>,
) -> axum::response::Response {
    if let Err(e) = require_detailer(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let filters = match query.into_filters() {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let filters = match services.organization.scope_bookings(identity.get(), filters).await {
        Ok(f) => f,
        Err(e) => return errors::service_error_to_response(e),
    };
    match services.bookings.list_bookings(&filters).await {
        Ok(rows) => (StatusCode::OK, Json(json!({ "data": rows }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let id = match errors::parse_id::<BookingId>(&id, "booking id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let booking = match services.bookings.get_booking_by_id(id).await {
        Ok(b) => b,
        Err(e) => return errors::service_error_to_response(e),
    };
    if let Err(e) = services.organization.ensure_booking_visible(identity.get(), &booking).await {
        return errors::service_error_to_response(e);
    }
    (StatusCode::OK, Json(json!({ "data": booking }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = require_detailer(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let Ok(Json(body)) = body else {
        return errors::bad_request("Missing required field: status");
    };
    let status = match body.status.parse::<BookingStatus>() {
        Ok(s) => s,
        Err(e) => return errors::bad_request(e.to_string()),
    };
    let id = match visible_booking(&services, identity, &id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .bookings
        .update_status(id, status, request_key(&headers, &identity))
        .await
    {
        Ok(update) => (StatusCode::OK, Json(json!({ "data": update }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub detailer_id: String,
}

pub async fn assign_detailer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<AssignRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let Ok(Json(body)) = body else {
        return errors::bad_request("Missing required field: detailer_id");
    };
    let (id, detailer_id) = match (
        errors::parse_id::<BookingId>(&id, "booking id"),
        errors::parse_id::<DetailerId>(&body.detailer_id, "detailer_id"),
    ) {
        (Ok(id), Ok(d)) => (id, d),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let booking = match services.bookings.get_booking_by_id(id).await {
        Ok(b) => b,
        Err(e) => return errors::service_error_to_response(e),
    };
    if let Err(e) = services
        .organization
        .authorize_assignment(identity.get(), &booking, detailer_id)
        .await
    {
        return errors::service_error_to_response(e);
    }
    match services
        .bookings
        .assign_detailer(id, detailer_id, request_key(&headers, &identity))
        .await
    {
        Ok(update) => (StatusCode::OK, Json(json!({ "data": update }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn accept_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Err(e) = require_detailer(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let id = match errors::parse_id::<BookingId>(&id, "booking id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.bookings.accept_booking(id, request_key(&headers, &identity)).await {
        Ok(update) => (StatusCode::OK, Json(json!({ "data": update }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn cancel_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let id = match visible_booking(&services, identity, &id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.bookings.cancel_booking(id, request_key(&headers, &identity)).await {
        Ok(update) => (StatusCode::OK, Json(json!({ "data": update }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub booking_date: Option<NaiveDate>,
    pub booking_time_start: Option<NaiveTime>,
    pub booking_time_end: Option<NaiveTime>,
    pub booking_lat: Option<f64>,
    pub booking_lng: Option<f64>,
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub exclude_detailer_ids: Vec<DetailerId>,
}

pub async fn check_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<RequestIdentity>,
    body: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = require_user(identity.get()) {
        return errors::auth_error_to_response(e);
    }
    let Ok(Json(body)) = body else {
        return errors::bad_request("Invalid request body");
    };
    let (Some(date), Some(time_start), Some(lat), Some(lng)) =
        (body.booking_date, body.booking_time_start, body.booking_lat, body.booking_lng)
    else {
        return errors::bad_request(
            "Missing required fields: booking_date, booking_time_start, booking_lat, booking_lng",
        );
    };
    let query = AvailabilityQuery {
        date,
        time_start,
        time_end: body.booking_time_end,
        lat,
        lng,
        radius_miles: body.radius_miles,
        exclude_detailer_ids: body.exclude_detailer_ids,
    };
    match services.bookings.check_availability(&query).await {
        Ok(rows) => (StatusCode::OK, Json(json!({ "data": rows }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Parse `raw` and require the caller to be able to see the booking.
async fn visible_booking(
    services: &AppServices,
    identity: RequestIdentity,
    raw: &str,
) -> Result<BookingId, axum::response::Response> {
    let id = errors::parse_id::<BookingId>(raw, "booking id")?;
    let booking = services
        .bookings
        .get_booking_by_id(id)
        .await
        .map_err(errors::service_error_to_response)?;
    services
        .organization
        .ensure_booking_visible(identity.get(), &booking)
        .await
        .map_err(errors::service_error_to_response)?;
    Ok(id)
}

/// The caller's `Idempotency-Key`, scoped to their profile.
fn request_key<'a>(headers: &'a HeaderMap, identity: &RequestIdentity) -> Option<RequestKey<'a>> {
    let actor = identity.get()?.profile_id;
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|key| RequestKey::new(actor, key))
}
