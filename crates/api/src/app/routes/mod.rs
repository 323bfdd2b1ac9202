use axum::{Router, routing::get};

pub mod admin;
pub mod bookings;
pub mod detailer;
pub mod fees;
pub mod finance;
pub mod organization;
pub mod system;
pub mod test_payments;

/// JSON API under `/api`.
pub fn api_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/config/maps", get(system::maps_config))
        .nest("/bookings", bookings::router())
        .nest("/organization", organization::router())
        .nest("/admin", finance::router())
        .nest("/fees", fees::router())
        .nest("/test", test_payments::router())
}

/// Guarded page routes.
pub fn pages_router() -> Router {
    Router::new()
        .route("/auth/login", get(system::login))
        .nest("/admin", admin::router())
        .nest("/detailer", detailer::router())
}
