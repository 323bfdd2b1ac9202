//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: platform selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Layer order, outermost first: origin check, session resolution, route
/// guard, handlers.
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::pages_router())
        .nest("/api", routes::api_router())
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::route_guard_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::session_middleware,
        ))
        .layer(
            ServiceBuilder::new().layer(axum::middleware::from_fn_with_state(
                services,
                middleware::origin_middleware,
            )),
        )
}
