mod agent;
mod config;
mod error;
mod http_server;
mod platform;
mod printer;
mod receipt;

use std::sync::Arc;

use agent::PrintAgent;
use printer::connection::RusbTransport;
use printer::discovery::RusbDevices;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("usb_print_agent=info".parse().unwrap()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config()?;
    tracing::info!(
        "Starting print agent (enabled: {}, default printer: {})",
        config.enabled,
        config
            .default_printer
            .map_or_else(|| "none".to_string(), |s| s.to_string())
    );

    platform::log_usb_access_warnings();

    let agent = Arc::new(PrintAgent::new(
        &config,
        Arc::new(RusbDevices),
        Arc::new(RusbTransport::new(config.usb_timeout)),
    ));
    let router = http_server::build_router(agent, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| format!("Bind {}: {e}", config.bind))?;

    http_server::serve(listener, router, shutdown_signal()).await?;
    tracing::info!("Print agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
