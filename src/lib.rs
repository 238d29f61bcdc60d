// Multi-tenant WhatsApp gateway: one linked session per school, exposed over HTTP
// for pairing and fee-alert dispatch.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod session;
pub mod web;

use anyhow::Context;
use log::info;
use std::sync::Arc;

use config::GatewayConfig;
use engine::DriverFactory;
use session::SessionManager;
use web::{create_router, AppState};

/// Serve the gateway until Ctrl-C, then release every session
pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    config.validate()?;
    let addr = config.bind_addr()?;

    let factory = Arc::new(DriverFactory::new(config.driver_config()));
    let manager = Arc::new(SessionManager::new(factory, config.manager_config()));
    let router = create_router(Arc::new(AppState::new(manager.clone())));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Gateway running at http://{}", addr);
    info!("Credential root: {}", config.auth_root.display());

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    manager.shutdown_all().await;
    Ok(())
}
