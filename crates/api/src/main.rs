use std::sync::Arc;

use anyhow::Context;

use detailr_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    detailr_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let bind_addr = config.bind_addr;

    let services = detailr_api::app::build_services(config).await?;
    let app = detailr_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
