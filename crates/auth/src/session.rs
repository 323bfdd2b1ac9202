//! Session token verification (HS256).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

/// Turns a raw session token into validated claims.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError>;
}

/// Shared-secret HS256 session tokens.
pub struct Hs256SessionValidator {
    secret: Vec<u8>,
}

impl Hs256SessionValidator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign claims with the same secret (dev login, tests).
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenValidationError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|_| TokenValidationError::Malformed)
    }
}

impl SessionValidator for Hs256SessionValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenValidationError> {
        // Expiry is carried in `expires_at`, checked by `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|_| TokenValidationError::Malformed)?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use detailr_core::ProfileId;

    fn fresh_claims() -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: ProfileId::new(),
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn signed_token_validates() {
        let validator = Hs256SessionValidator::new("test-secret");
        let claims = fresh_claims();
        let token = validator.sign(&claims).unwrap();
        assert_eq!(validator.validate(&token, Utc::now()).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let token = Hs256SessionValidator::new("a").sign(&fresh_claims()).unwrap();
        let err = Hs256SessionValidator::new("b").validate(&token, Utc::now()).unwrap_err();
        assert_eq!(err, TokenValidationError::Malformed);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = Hs256SessionValidator::new("a")
            .validate("not.a.token", Utc::now())
            .unwrap_err();
        assert_eq!(err, TokenValidationError::Malformed);
    }
}
