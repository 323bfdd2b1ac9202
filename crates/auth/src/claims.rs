use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use detailr_core::ProfileId;

/// What a verified session token asserts about its bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Profile the session belongs to.
    pub sub: ProfileId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("session token could not be decoded or verified")]
    Malformed,

    #[error("session has expired")]
    Expired,

    #[error("session issued in the future")]
    NotYetValid,

    #[error("session expires before it was issued")]
    InvalidTimeWindow,
}

/// Check the session's time window against `now`. Signatures are verified
/// in [`crate::session`] before this runs.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
