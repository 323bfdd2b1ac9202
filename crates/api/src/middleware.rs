//! Request-edge middleware: session resolution, route guard, origin check.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::{debug, warn};

use detailr_auth::{RoleLookup, RouteDecision, Viewer};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestIdentity;

pub const SESSION_COOKIE: &str = "sb-session";

/// Resolve the session (cookie first, then bearer header) and the viewer's
/// platform role. Never rejects: anonymous requests continue with no identity.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let viewer = match extract_token(req.headers()) {
        None => Viewer::Anonymous,
        Some(token) => match services.sessions.validate(token, Utc::now()) {
            Err(e) => {
                debug!(error = %e, "ignoring invalid session token");
                Viewer::Anonymous
            }
            Ok(claims) => {
                let role = match services.directory.get_profile(claims.sub).await {
                    Ok(Some(profile)) => RoleLookup::Resolved(profile.role),
                    Ok(None) => {
                        warn!(profile_id = %claims.sub, "session for unknown profile");
                        RoleLookup::Unavailable
                    }
                    Err(e) => {
                        warn!(profile_id = %claims.sub, error = %e, "profile role lookup failed");
                        RoleLookup::Unavailable
                    }
                };
                Viewer::Authenticated {
                    profile_id: claims.sub,
                    role,
                }
            }
        },
    };

    req.extensions_mut().insert(RequestIdentity::from_viewer(&viewer));
    req.extensions_mut().insert(viewer);
    next.run(req).await
}

/// Prefix-based page guard; redirects (307) instead of rendering.
pub async fn route_guard_middleware(
    State(services): State<Arc<AppServices>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let viewer = req
        .extensions()
        .get::<Viewer>()
        .copied()
        .unwrap_or(Viewer::Anonymous);

    match services.route_guard.decide(req.uri().path(), &viewer) {
        RouteDecision::Continue => next.run(req).await,
        RouteDecision::Redirect(to) => {
            debug!(path = %req.uri().path(), to = %to, "route guard redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}

/// Reject mutating `/api` requests whose `Origin` is not allowed.
/// Requests without an `Origin` header (non-browser clients) pass.
pub async fn origin_middleware(
    State(services): State<Arc<AppServices>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let mutating = !matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if mutating && req.uri().path().starts_with("/api/") {
        if let Some(origin) = req.headers().get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
            if !services.config.origin_allowed(origin) {
                warn!(origin, path = %req.uri().path(), "blocked cross-origin request");
                return errors::json_error(StatusCode::FORBIDDEN, "Forbidden: origin not allowed");
            }
        }
    }
    next.run(req).await
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    session_cookie(headers).or_else(|| bearer(headers))
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|v| !v.is_empty())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers), Some("from-header"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-session=from-cookie; other=1"),
        );
        assert_eq!(extract_token(&headers), Some("from-cookie"));
    }

    #[test]
    fn missing_or_empty_tokens() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-session="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);
    }
}
