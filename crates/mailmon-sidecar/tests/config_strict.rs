#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use mailmon_sidecar::config::{self, ExporterKind};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
sidecar:
  listen: "0.0.0.0:8080"
  refresh_intervl_ms: 5000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.sidecar.listen, "0.0.0.0:8080");
    assert_eq!(cfg.sidecar.scrape_listen, "0.0.0.0:8000");
    assert_eq!(cfg.sidecar.refresh_interval_ms, 5000);
    assert_eq!(cfg.tracing.exporter, ExporterKind::OtlpGrpc);
    assert_eq!(cfg.tracing.endpoint, "http://otel-collector:4317");
}

#[test]
fn exporter_kind_is_snake_case() {
    let cfg = config::load_from_str(
        r#"
version: 1
tracing:
  exporter: none
"#,
    )
    .expect("must parse");
    assert_eq!(cfg.tracing.exporter, ExporterKind::None);
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "version: 2\n",
        "version: 1\nsidecar: { listen: \"not-an-addr\" }\n",
        "version: 1\nsidecar: { listen: \"0.0.0.0:9000\", scrape_listen: \"0.0.0.0:9000\" }\n",
        "version: 1\nsidecar: { refresh_interval_ms: 0 }\n",
        "version: 1\ntracing: { queue_capacity: 0 }\n",
        "version: 1\ntracing: { queue_capacity: 8, max_batch_size: 16 }\n",
        "version: 1\ntracing: { endpoint: \"otel-collector:4317\" }\n",
    ];
    for yaml in cases {
        let err = config::load_from_str(yaml).expect_err(yaml);
        assert_eq!(err.code().as_str(), "CONFIG", "{yaml}");
    }
}

#[test]
fn tls_endpoint_is_rejected_for_grpc() {
    let err = config::load_from_str(
        "version: 1\ntracing: { exporter: otlp_grpc, endpoint: \"https://otel-collector:4317\" }\n",
    )
    .expect_err("https needs a TLS channel");
    assert_eq!(err.code().as_str(), "CONFIG");

    // Endpoint is not dialed for local exporters.
    let cfg = config::load_from_str(
        "version: 1\ntracing: { exporter: log, endpoint: \"https://otel-collector:4317\" }\n",
    )
    .expect("log exporter ignores endpoint");
    assert_eq!(cfg.tracing.exporter, ExporterKind::Log);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = config::load_from_file("does-not-exist.yaml").expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIG");
}
