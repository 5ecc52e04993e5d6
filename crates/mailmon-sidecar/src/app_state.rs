//! Shared application state for the mailmon sidecar.
//!
//! Built once by the entry point and cloned into both routers. The gauge store
//! and tracer provider live here instead of in process-wide globals so tests can
//! build as many independent instances as they need.

use std::sync::Arc;

use mailmon_core::gauge::GaugeStore;

use crate::obs::Telemetry;

#[derive(Clone)]
pub struct AppState {
    gauges: Arc<GaugeStore>,
    telemetry: Telemetry,
}

impl AppState {
    pub fn new(gauges: Arc<GaugeStore>, telemetry: Telemetry) -> Self {
        Self { gauges, telemetry }
    }

    /// Standard gauge set, no span export.
    pub fn standalone() -> Self {
        Self::new(Arc::new(GaugeStore::standard()), Telemetry::disabled())
    }

    pub fn gauges(&self) -> Arc<GaugeStore> {
        Arc::clone(&self.gauges)
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}
