use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;

use mapify_rs::server::{build_router, CorsSettings};
use mapify_rs::{AppContext, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    config.validate()?;

    log::info!("mapify starting");
    log::info!("  Data dir: {:?}", config.data_dir);
    log::info!("  OSRM: {} ({})", config.osrm_url, config.osrm_profile);
    log::info!(
        "  Buffers: {} within {} km",
        config.buffer_category,
        config.buffer_radius_km
    );

    // Load once; handlers only read from here on
    let ctx = Arc::new(AppContext::load(&config));
    let app = build_router(ctx, &CorsSettings::from(&config), &config.data_dir);

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Ctrl-C received, draining connections");
}
