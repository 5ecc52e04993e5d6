//! Request tracing and span export.
//!
//! Spans are produced by [`layer::trace_request`] through an explicitly built
//! `TracerProvider` held in [`Telemetry`]; nothing is installed globally. The
//! provider feeds a batch span processor whose bounded queue drops new spans
//! when full, so export never blocks or fails the request path.

pub mod layer;
pub mod log_exporter;

use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::trace::{BatchConfig, BatchConfigBuilder, BatchSpanProcessor, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};

use mailmon_core::error::{MailmonError, Result};

use crate::config::{ExporterKind, TracingSection};

pub use log_exporter::LogExporter;

/// Instrumentation scope name on every span.
pub const TRACER_NAME: &str = "mailmon-sidecar";

/// Floor for the batch timers; `tokio::time::interval` rejects zero.
const MIN_TIMER: Duration = Duration::from_millis(1);

/// Batching parameters for the span processor.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub queue_capacity: usize,
    pub max_batch_size: usize,
    pub flush_interval: Duration,
    pub export_timeout: Duration,
}

impl ExportOptions {
    fn batch_config(&self) -> BatchConfig {
        let queue = self.queue_capacity.max(1);
        BatchConfigBuilder::default()
            .with_max_queue_size(queue)
            .with_max_export_batch_size(self.max_batch_size.clamp(1, queue))
            .with_scheduled_delay(self.flush_interval.max(MIN_TIMER))
            .with_max_export_timeout(self.export_timeout.max(MIN_TIMER))
            .build()
    }
}

impl From<&TracingSection> for ExportOptions {
    fn from(cfg: &TracingSection) -> Self {
        Self {
            queue_capacity: cfg.queue_capacity,
            max_batch_size: cfg.max_batch_size,
            flush_interval: cfg.flush_interval(),
            export_timeout: cfg.export_timeout(),
        }
    }
}

/// Tracer provider plus the tracer handed to request middleware.
#[derive(Clone)]
pub struct Telemetry {
    provider: TracerProvider,
    tracer: Tracer,
    enabled: bool,
}

impl Telemetry {
    fn from_provider(provider: TracerProvider, enabled: bool) -> Self {
        let tracer = provider.tracer(TRACER_NAME);
        Self { provider, tracer, enabled }
    }

    /// Provider without processors: spans are created and dropped on end.
    pub fn disabled() -> Self {
        Self::from_provider(TracerProvider::builder().build(), false)
    }

    /// Batch spans into `exporter`. Must be called inside a tokio runtime.
    pub fn with_exporter<E>(exporter: E, service_name: &str, opts: ExportOptions) -> Self
    where
        E: SpanExporter + 'static,
    {
        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(opts.batch_config())
            .build();
        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(Resource::new([KeyValue::new("service.name", service_name.to_string())]))
            .build();
        Self::from_provider(provider, true)
    }

    pub fn from_config(cfg: &TracingSection) -> Result<Self> {
        let opts = ExportOptions::from(cfg);
        match cfg.exporter {
            ExporterKind::OtlpGrpc => {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(cfg.endpoint.clone())
                    .with_timeout(cfg.export_timeout())
                    .build()
                    .map_err(|e| MailmonError::Config(format!("build otlp exporter failed: {e}")))?;
                Ok(Self::with_exporter(exporter, &cfg.service_name, opts))
            }
            ExporterKind::Log => Ok(Self::with_exporter(LogExporter, &cfg.service_name, opts)),
            ExporterKind::None => Ok(Self::disabled()),
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flush queued spans and stop the processor.
    ///
    /// The SDK blocks the calling thread until the batch task acknowledges,
    /// so this runs on the blocking pool.
    pub async fn shutdown(&self) {
        if !self.enabled {
            return;
        }
        let provider = self.provider.clone();
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => tracing::debug!("span export stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "span export shutdown failed"),
            Err(e) => tracing::warn!(error = %e, "span export shutdown task failed"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use futures_util::future::BoxFuture;
    use opentelemetry::trace::{Span as _, TraceError, Tracer as _};
    use opentelemetry_sdk::export::trace::{ExportResult, SpanData};

    #[derive(Debug, Clone, Default)]
    struct Recording {
        names: Arc<Mutex<Vec<String>>>,
    }

    impl SpanExporter for Recording {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            self.names.lock().unwrap().extend(batch.into_iter().map(|s| s.name.into_owned()));
            Box::pin(std::future::ready(Ok(())))
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl SpanExporter for Failing {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            Box::pin(std::future::ready(Err(TraceError::Other("collector unreachable".into()))))
        }
    }

    fn opts() -> ExportOptions {
        ExportOptions {
            queue_capacity: 16,
            max_batch_size: 16,
            flush_interval: Duration::from_secs(3600),
            export_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn queued_spans_are_flushed_on_shutdown() {
        let rec = Recording::default();
        let telemetry = Telemetry::with_exporter(rec.clone(), "mailmon", opts());

        telemetry.tracer().start("health-check").end();
        telemetry.tracer().start("metrics-endpoint").end();
        telemetry.shutdown().await;

        assert_eq!(*rec.names.lock().unwrap(), vec!["health-check", "metrics-endpoint"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn zero_sized_options_are_clamped() {
        let rec = Recording::default();
        let zero = ExportOptions {
            queue_capacity: 0,
            max_batch_size: 0,
            flush_interval: Duration::ZERO,
            export_timeout: Duration::ZERO,
        };
        let telemetry = Telemetry::with_exporter(rec.clone(), "mailmon", zero);

        telemetry.tracer().start("health-check").end();
        tokio::time::sleep(Duration::from_millis(50)).await;
        telemetry.shutdown().await;

        assert_eq!(*rec.names.lock().unwrap(), vec!["health-check"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn export_errors_stay_inside_the_processor() {
        let telemetry = Telemetry::with_exporter(Failing, "mailmon", opts());
        telemetry.tracer().start("health-check").end();
        telemetry.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn exporter_kind_selects_pipeline() {
        let mut cfg = TracingSection::default();
        cfg.exporter = ExporterKind::None;
        assert!(!Telemetry::from_config(&cfg).unwrap().is_enabled());

        cfg.exporter = ExporterKind::Log;
        let telemetry = Telemetry::from_config(&cfg).unwrap();
        assert!(telemetry.is_enabled());
        telemetry.shutdown().await;
    }
}
