//! Pizzaz MCP server.

use clap::Parser;
use pizzaz::{
    catalog::Catalog, config::Config, create_app, logging::init_logging, state::AppState,
};
use pizzaz_types::{POST_PATH, SSE_PATH};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Pizzaz - MCP widget server over Server-Sent Events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT and config files)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the widget HTML
    #[arg(long)]
    widget_html: Option<PathBuf>,

    /// Extra TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A broken config falls back to defaults (plus PORT) instead of aborting.
    let loaded = Config::from_figment(args.port, args.widget_html.clone(), args.config);
    let (config, config_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (
            Config::from_env().with_overrides(args.port, args.widget_html),
            Some(e),
        ),
    };

    let _log_guard = init_logging(&config.logging)?;
    if let Some(e) = config_error {
        warn!("Invalid configuration, using defaults: {}", e);
    }

    let catalog = Catalog::load(&config.widget_html)?;
    let state = AppState::new(catalog, config.session);
    let app = create_app(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Pizzaz MCP server listening on http://localhost:{}", config.port);
    info!("  SSE stream: GET http://localhost:{}{}", config.port, SSE_PATH);
    info!(
        "  Message post endpoint: POST http://localhost:{}{}?sessionId=...",
        config.port, POST_PATH
    );

    // Open SSE streams never finish on their own; closing every session
    // ends them so graceful shutdown can complete.
    let sessions = state.sessions().clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
        sessions.close_all();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down");
    Ok(())
}
