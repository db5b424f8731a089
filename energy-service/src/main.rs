use anyhow::Result;
use energy_service::{api, config::AppConfig, metrics_server, observability, open_store, EnergyService};
use std::{net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Schema is created here, once, before the listener accepts requests.
    let store = open_store(&cfg.database).await?;
    let service = Arc::new(EnergyService::new(store, &cfg.analytics));

    let addr: SocketAddr = cfg
        .server
        .http_bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.http_bind_addr: {e}"))?;

    let app = api::app(service, cfg.server.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        scope = ?cfg.analytics.integration_scope,
        factor = cfg.analytics.emissions_factor_kg_co2_per_kwh,
        "energy service listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("energy service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
