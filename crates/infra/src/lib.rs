//! Infrastructure layer: data-platform boundary, config, services.

pub mod config;
pub mod error;
pub mod idempotency;
pub mod platform;
pub mod services;

pub use config::AppConfig;
pub use error::{ConfigError, PlatformError, ServiceError, ServiceResult};
pub use idempotency::{IdempotencyWindow, Lookup, RequestKey};
pub use platform::{BookingStore, BookingUpdate, DirectoryStore, FinanceStore, InMemoryPlatform, Page, PgPlatform};
