//! entitlement-sync server binary.

use std::process::ExitCode;

use entitlement_sync::bootstrap::{build_app, StartupError};
use entitlement_sync::config::AppConfig;
use entitlement_sync::telemetry::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("entitlement-sync: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    let app = build_app(&config)?;
    let addr = config.server.socket_addr()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        "Listening for billing webhooks"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not install shutdown handler");
        std::future::pending::<()>().await;
    }
}
