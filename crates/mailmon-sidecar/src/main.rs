//! mailmon sidecar
//!
//! - Primary listener: /health, /metrics (one exported span per request)
//! - Scrape listener: /metrics only
//! - Background refresher: synthetic gauges every refresh interval

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use mailmon_core::error::Result;
use mailmon_sidecar::{config, server::Sidecar};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "mailmon-sidecar failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load(std::env::args().nth(1))?;
    tracing::info!(
        listen = %cfg.sidecar.listen,
        scrape_listen = %cfg.sidecar.scrape_listen,
        refresh_interval_ms = cfg.sidecar.refresh_interval_ms,
        exporter = ?cfg.tracing.exporter,
        "mailmon-sidecar starting"
    );

    let sidecar = Sidecar::start(&cfg).await?;
    sidecar.serve(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
