//! Service wiring: picks the platform implementation and builds the
//! application services on top of it.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use detailr_auth::{Hs256SessionValidator, RouteGuard, SessionValidator};
use detailr_infra::services::{
    AdminService, BookingService, FeeCalculator, ModeResolver, OrganizationService,
};
use detailr_infra::{AppConfig, BookingStore, DirectoryStore, FinanceStore, InMemoryPlatform, PgPlatform};

pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionValidator>,
    pub route_guard: RouteGuard,
    pub directory: Arc<dyn DirectoryStore>,
    pub bookings: BookingService,
    pub fees: FeeCalculator,
    pub organization: OrganizationService,
    pub admin: AdminService,
}

impl AppServices {
    /// Wire every service over a single platform implementation.
    pub fn over<P>(config: AppConfig, platform: Arc<P>) -> Self
    where
        P: BookingStore + DirectoryStore + FinanceStore + 'static,
    {
        let config = Arc::new(config);
        let directory: Arc<dyn DirectoryStore> = platform.clone();
        let finance: Arc<dyn FinanceStore> = platform.clone();
        let bookings: Arc<dyn BookingStore> = platform;

        let modes = Arc::new(ModeResolver::new(directory.clone(), config.mode_failure_policy));

        Self {
            sessions: Arc::new(Hs256SessionValidator::new(config.session_secret.clone().into_bytes())),
            route_guard: RouteGuard::default(),
            bookings: BookingService::new(bookings),
            fees: FeeCalculator::new(directory.clone(), finance.clone()),
            organization: OrganizationService::new(directory.clone(), modes),
            admin: AdminService::new(directory.clone(), finance, config.clone()),
            directory,
            config,
        }
    }
}

pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        let url = config.require_database_url()?.to_string();
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!("using Postgres platform");
        return Ok(AppServices::over(config, Arc::new(PgPlatform::new(pool))));
    }

    tracing::warn!("USE_PERSISTENT_STORES not set, using empty in-memory platform");
    Ok(AppServices::over(config, Arc::new(InMemoryPlatform::new())))
}
