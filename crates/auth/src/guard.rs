//! Coarse path-prefix access control, evaluated before any page logic runs.
//!
//! Fine-grained checks (e.g. "may this dispatcher assign this booking") belong
//! to the permission evaluator at the point of action.

use detailr_core::ProfileId;

use crate::roles::UserRole;

/// Outcome of resolving the viewer's platform role.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoleLookup {
    Resolved(UserRole),
    /// The profile read failed or returned nothing.
    Unavailable,
}

/// Who is making the request, as far as the edge can tell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Authenticated { profile_id: ProfileId, role: RoleLookup },
}

impl Viewer {
    pub fn role(&self) -> Option<UserRole> {
        match self {
            Viewer::Authenticated {
                role: RoleLookup::Resolved(role),
                ..
            } => Some(*role),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Continue,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub detailer_prefix: String,
    pub admin_prefix: String,
    pub login_path: String,
    pub admin_home: String,
    pub detailer_home: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            detailer_prefix: "/detailer".to_string(),
            admin_prefix: "/admin".to_string(),
            login_path: "/auth/login".to_string(),
            admin_home: "/admin".to_string(),
            detailer_home: "/detailer/dashboard".to_string(),
        }
    }
}

impl RouteGuard {
    /// Decide what to do with a request for `path`.
    ///
    /// A failed role lookup counts as unauthorized on restricted prefixes but
    /// never forces a redirect away from the login page, so a user whose
    /// profile read is failing is not bounced in a loop.
    pub fn decide(&self, path: &str, viewer: &Viewer) -> RouteDecision {
        let role = viewer.role();

        if has_prefix(path, &self.detailer_prefix) {
            return match role {
                Some(r) if r.has_detailer_access() => RouteDecision::Continue,
                _ => self.to_login(),
            };
        }

        if has_prefix(path, &self.admin_prefix) {
            return match role {
                Some(r) if r.is_admin() => RouteDecision::Continue,
                _ => self.to_login(),
            };
        }

        if path == self.login_path {
            if let Some(home) = role.and_then(|r| self.home_for(r)) {
                return RouteDecision::Redirect(home.to_string());
            }
        }

        RouteDecision::Continue
    }

    /// Landing page for a role, if it has one.
    pub fn home_for(&self, role: UserRole) -> Option<&str> {
        match role {
            UserRole::Admin => Some(&self.admin_home),
            UserRole::Detailer => Some(&self.detailer_home),
            UserRole::Customer => None,
        }
    }

    fn to_login(&self) -> RouteDecision {
        RouteDecision::Redirect(self.login_path.clone())
    }
}

/// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/users`,
/// not `/administrators`.
fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}
