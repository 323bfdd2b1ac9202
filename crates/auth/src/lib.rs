//! `detailr-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand
//! in an explicit [`Identity`] (or its absence) and get typed decisions back.

pub mod authorize;
pub mod claims;
pub mod guard;
pub mod permissions;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{AuthError, require_admin, require_capability, require_detailer, require_user};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use guard::{RoleLookup, RouteDecision, RouteGuard, Viewer};
pub use permissions::{Capability, OrgPermissions, has_permission, permissions_for};
pub use policy::FailurePolicy;
pub use principal::Identity;
pub use roles::{OrgRole, UserRole};
pub use session::{Hs256SessionValidator, SessionValidator};
