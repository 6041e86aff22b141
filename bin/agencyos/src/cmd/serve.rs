//! Serve command - render pages over HTTP

use std::{path::Path, sync::Arc};

use agencyos_blocks::Resolver;
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;

use super::{content_source, load_config};
use crate::server::{AppState, create_router};

/// Run the serve command.
///
/// Resolves and renders pages on request until interrupted.
pub async fn run(config_path: &Path, host: &str, port: u16, fixtures: Option<&Path>) -> Result<()> {
    tracing::info!(?config_path, host, port, "Starting server");

    let config = Arc::new(load_config(config_path)?);
    let source = content_source(&config, fixtures)?;
    let resolver = Resolver::from_config(source, &config.content);
    tracing::debug!(?resolver, "resolver ready");

    let app = create_router(AppState::new(Arc::clone(&config), resolver));
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    println!();
    println!("  {} running at http://{addr}", config.site.name);
    match fixtures {
        Some(dir) => println!("  Content: fixtures in {}", dir.display()),
        None => println!("  Content: {}", config.content_url()),
    }
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
