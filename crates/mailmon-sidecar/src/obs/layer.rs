//! Per-request span middleware for the primary router.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::{Span, SpanKind, Status, Tracer};
use opentelemetry::KeyValue;
use tracing::Instrument;

use crate::app_state::AppState;

/// Span name for a matched route.
pub fn span_name(route: &str) -> &'static str {
    match route {
        "/health" => "health-check",
        "/metrics" => "metrics-endpoint",
        _ => "http-request",
    }
}

/// Wrap one request in a server span; the span ends once the response is built.
///
/// Must be installed with `Router::route_layer` so `MatchedPath` is present.
pub async fn trace_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().to_string();
    let name = span_name(&route);

    let tracer = state.telemetry().tracer();
    let mut span = tracer
        .span_builder(name)
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new("http.method", method.clone()),
            KeyValue::new("http.route", route.clone()),
        ])
        .start(tracer);
    let local = tracing::info_span!(
        "http",
        op = name,
        trace_id = %span.span_context().trace_id(),
        %method,
        %route
    );

    let resp = next.run(req).instrument(local.clone()).await;

    let status = resp.status();
    span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    span.set_status(if status.is_server_error() {
        Status::error(status.to_string())
    } else {
        Status::Ok
    });
    span.end();

    local.in_scope(|| tracing::debug!(status = status.as_u16(), "request done"));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_routes_get_fixed_names() {
        assert_eq!(span_name("/health"), "health-check");
        assert_eq!(span_name("/metrics"), "metrics-endpoint");
        assert_eq!(span_name("/other"), "http-request");
    }
}
