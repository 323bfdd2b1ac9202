//! Request authorization guards.
//!
//! - No IO
//! - No panics
//! - Errors carry the HTTP-style status the transport should answer with

use thiserror::Error;

use crate::permissions::{Capability, has_permission};
use crate::principal::Identity;
use crate::roles::OrgRole;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No valid session / profile.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid session, insufficient role or capability.
    #[error("{0}")]
    Forbidden(String),
}

impl AuthError {
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("Unauthorized".to_string())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Unauthenticated(m) | Self::Forbidden(m) => m,
        }
    }
}

/// Any authenticated profile.
pub fn require_user(identity: Option<&Identity>) -> Result<&Identity, AuthError> {
    identity.ok_or_else(AuthError::unauthenticated)
}

/// Detailer or admin.
pub fn require_detailer(identity: Option<&Identity>) -> Result<&Identity, AuthError> {
    let identity = require_user(identity)?;
    if identity.role.has_detailer_access() {
        Ok(identity)
    } else {
        Err(AuthError::forbidden("Forbidden: detailer access required"))
    }
}

pub fn require_admin(identity: Option<&Identity>) -> Result<&Identity, AuthError> {
    let identity = require_user(identity)?;
    if identity.role.is_admin() {
        Ok(identity)
    } else {
        Err(AuthError::forbidden("Forbidden: admin access required"))
    }
}

/// Organization-scoped capability check, run before invoking the remote action.
pub fn require_capability(role: Option<OrgRole>, capability: Capability) -> Result<(), AuthError> {
    if has_permission(role, capability) {
        Ok(())
    } else {
        Err(AuthError::forbidden(format!(
            "Forbidden: missing permission '{capability}'"
        )))
    }
}
