//! xe-probe entry point: one-shot JSON snapshot by default, HTTP daemon
//! with --daemon.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use xe_probe::{cli, http, logging, probe};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::LogConfig::from_debug_flag(args.debug)
        .init()
        .context("failed to initialize logging")?;

    let probe = probe::Probe::default();

    if !args.daemon {
        let snapshot = probe.snapshot();
        let json =
            serde_json::to_string_pretty(&snapshot).context("failed to serialize snapshot")?;
        println!("{json}");
        return Ok(());
    }

    let app = http::build_router(http::AppState { probe });
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    info!("shutting down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM so daemon mode exits cleanly with status 0.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
