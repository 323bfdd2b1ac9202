//! Infrastructure and service error model.

use thiserror::Error;

use detailr_auth::AuthError;
use detailr_core::DomainError;

/// Failure talking to the external data platform.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The call itself failed (unreachable, SQL error, procedure raised).
    #[error("remote call '{procedure}' failed: {message}")]
    Remote {
        procedure: &'static str,
        message: String,
    },

    /// The call succeeded but its result did not have the expected shape.
    #[error("remote call '{procedure}' returned an unexpected shape: {message}")]
    ContractViolation {
        procedure: &'static str,
        message: String,
    },
}

impl PlatformError {
    pub fn remote(procedure: &'static str, message: impl Into<String>) -> Self {
        Self::Remote {
            procedure,
            message: message.into(),
        }
    }

    pub fn contract(procedure: &'static str, message: impl Into<String>) -> Self {
        Self::ContractViolation {
            procedure,
            message: message.into(),
        }
    }

    pub fn procedure(&self) -> &'static str {
        match self {
            Self::Remote { procedure, .. } | Self::ContractViolation { procedure, .. } => procedure,
        }
    }
}

/// Missing or malformed runtime configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Error surfaced by the service layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing row or failed read; the two are not distinguished to callers.
    #[error("not found")]
    NotFoundOrInaccessible,

    #[error("validation failed: {0}")]
    Validation(String),

    /// The request clashes with one already recorded (e.g. a reused
    /// idempotency key carrying a different payload).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A named booking command errored or returned no result.
    #[error("{command} failed: {reason}")]
    CommandFailed { command: &'static str, reason: String },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn command_failed(command: &'static str, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command,
            reason: reason.into(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
