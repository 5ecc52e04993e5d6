//! Span exporter that writes finished spans to the local log.

use futures_util::future::BoxFuture;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};

#[derive(Debug, Default)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        for s in batch {
            let elapsed_us = s
                .end_time
                .duration_since(s.start_time)
                .map(|d| d.as_micros() as u64)
                .unwrap_or(0);
            tracing::debug!(
                trace_id = %s.span_context.trace_id(),
                span_id = %s.span_context.span_id(),
                span_name = %s.name,
                elapsed_us,
                status = ?s.status,
                "span"
            );
        }
        Box::pin(std::future::ready(Ok(())))
    }
}
