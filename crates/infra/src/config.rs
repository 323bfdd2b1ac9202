//! Runtime configuration.
//!
//! Read once at startup from the environment. Secrets that only some requests
//! need (payment key, maps key, test-payment secret) stay optional here and
//! are demanded by the code path that uses them, so a missing value surfaces
//! as a per-request configuration error instead of a boot failure.

use std::net::SocketAddr;

use tracing::warn;

use detailr_auth::FailurePolicy;

use crate::error::ConfigError;

const DEV_SESSION_SECRET: &str = "dev-session-secret-change-me";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub session_secret: String,
    pub payment_secret_key: Option<String>,
    pub maps_api_key: Option<String>,
    /// Origins allowed to issue mutating `/api` requests. Empty disables the check.
    pub allowed_origins: Vec<String>,
    pub enable_test_payments: bool,
    pub test_payment_secret: Option<String>,
    pub use_persistent_stores: bool,
    pub mode_failure_policy: FailurePolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            message: format!("{e}"),
        })?;

        let session_secret = match get("SESSION_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("SESSION_SECRET not set, using insecure development secret");
                DEV_SESSION_SECRET.to_string()
            }
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mode_failure_policy = match get("MODE_FAILURE_POLICY").as_deref() {
            None | Some("fail_open") => FailurePolicy::FailOpen,
            Some("fail_closed") => FailurePolicy::FailClosed,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "MODE_FAILURE_POLICY",
                    message: format!("expected fail_open or fail_closed, got '{other}'"),
                });
            }
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            session_secret,
            payment_secret_key: get("PAYMENT_SECRET_KEY"),
            maps_api_key: get("MAPS_API_KEY"),
            allowed_origins,
            enable_test_payments: flag(get("ENABLE_TEST_PAYMENTS")),
            test_payment_secret: get("TEST_PAYMENT_SECRET"),
            use_persistent_stores: flag(get("USE_PERSISTENT_STORES")),
            mode_failure_policy,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn require_payment_secret(&self) -> Result<&str, ConfigError> {
        self.payment_secret_key
            .as_deref()
            .ok_or(ConfigError::Missing("PAYMENT_SECRET_KEY"))
    }

    pub fn require_maps_api_key(&self) -> Result<&str, ConfigError> {
        self.maps_api_key.as_deref().ok_or(ConfigError::Missing("MAPS_API_KEY"))
    }

    pub fn require_test_payment_secret(&self) -> Result<&str, ConfigError> {
        self.test_payment_secret
            .as_deref()
            .ok_or(ConfigError::Missing("TEST_PAYMENT_SECRET"))
    }

    /// `true` when `origin` may issue mutating requests.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|o| o == origin.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database_url: None,
            session_secret: DEV_SESSION_SECRET.to_string(),
            payment_secret_key: None,
            maps_api_key: None,
            allowed_origins: Vec::new(),
            enable_test_payments: false,
            test_payment_secret: None,
            use_persistent_stores: false,
            mode_failure_policy: FailurePolicy::FailOpen,
        }
    }
}

fn flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
