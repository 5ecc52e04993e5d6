//! Process wiring: bind both listeners, start background tasks, serve until
//! shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mailmon_core::error::{MailmonError, Result};
use mailmon_core::gauge::GaugeStore;

use crate::app_state::AppState;
use crate::config::SidecarConfig;
use crate::obs::Telemetry;
use crate::refresher::Refresher;
use crate::router;

/// A bound, running sidecar. Background tasks start in [`Sidecar::start`];
/// HTTP is served by [`Sidecar::serve`].
pub struct Sidecar {
    listener: TcpListener,
    scrape_listener: TcpListener,
    state: AppState,
    request_timeout: Duration,
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| MailmonError::Bind {
        addr: addr.to_string(),
        reason: e.to_string(),
    })
}

async fn bind_both(cfg: &SidecarConfig) -> Result<(TcpListener, TcpListener)> {
    let listener = bind(cfg.sidecar.listen_addr()?).await?;
    let scrape_listener = bind(cfg.sidecar.scrape_addr()?).await?;
    Ok((listener, scrape_listener))
}

impl Sidecar {
    /// Start with the span pipeline named in config.
    pub async fn start(cfg: &SidecarConfig) -> Result<Self> {
        let (listener, scrape_listener) = bind_both(cfg).await?;
        let telemetry = Telemetry::from_config(&cfg.tracing)?;
        Self::assemble(cfg, listener, scrape_listener, telemetry)
    }

    /// Start with an explicitly built span pipeline.
    pub async fn start_with_telemetry(cfg: &SidecarConfig, telemetry: Telemetry) -> Result<Self> {
        let (listener, scrape_listener) = bind_both(cfg).await?;
        Self::assemble(cfg, listener, scrape_listener, telemetry)
    }

    fn assemble(
        cfg: &SidecarConfig,
        listener: TcpListener,
        scrape_listener: TcpListener,
        telemetry: Telemetry,
    ) -> Result<Self> {
        let gauges = Arc::new(GaugeStore::standard());
        let refresher = Refresher::standard(Arc::clone(&gauges), cfg.sidecar.refresh_interval())?;

        if telemetry.is_enabled() {
            tracing::info!(exporter = ?cfg.tracing.exporter, "span export enabled");
        } else {
            tracing::info!("span export disabled");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks = vec![refresher.spawn(stop_rx)];

        Ok(Self {
            listener,
            scrape_listener,
            state: AppState::new(gauges, telemetry),
            request_timeout: cfg.sidecar.request_timeout(),
            stop_tx,
            tasks,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| MailmonError::Internal(format!("local_addr failed: {e}")))
    }

    pub fn scrape_addr(&self) -> Result<SocketAddr> {
        self.scrape_listener
            .local_addr()
            .map_err(|e| MailmonError::Internal(format!("local_addr failed: {e}")))
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve both listeners until `shutdown` resolves, then stop the
    /// refresher and flush queued spans.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Sidecar { listener, scrape_listener, state, request_timeout, stop_tx, tasks } = self;

        tracing::info!(listen = ?listener.local_addr().ok(), scrape = ?scrape_listener.local_addr().ok(), "mailmon-sidecar serving");

        let stop_rx = stop_tx.subscribe();
        let trigger = tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        });

        let telemetry = state.telemetry().clone();
        let primary = axum::serve(listener, router::build_router(state.clone(), request_timeout))
            .with_graceful_shutdown(stopped(stop_rx.clone()));
        let scrape = axum::serve(scrape_listener, router::build_scrape_router(state, request_timeout))
            .with_graceful_shutdown(stopped(stop_rx));

        let (primary, scrape) = tokio::join!(primary, scrape);
        trigger.abort();

        for task in tasks {
            let _ = task.await;
        }
        telemetry.shutdown().await;

        primary.map_err(|e| MailmonError::Internal(format!("primary listener failed: {e}")))?;
        scrape.map_err(|e| MailmonError::Internal(format!("scrape listener failed: {e}")))?;
        tracing::info!("mailmon-sidecar stopped");
        Ok(())
    }
}

/// Resolves once the stop flag is set or its sender is gone.
async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
