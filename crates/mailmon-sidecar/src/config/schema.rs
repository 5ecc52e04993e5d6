use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use mailmon_core::error::{MailmonError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidecarConfig {
    pub version: u32,

    #[serde(default)]
    pub sidecar: SidecarSection,

    #[serde(default)]
    pub tracing: TracingSection,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            version: 1,
            sidecar: SidecarSection::default(),
            tracing: TracingSection::default(),
        }
    }
}

impl SidecarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MailmonError::Config(format!("unsupported config version {}", self.version)));
        }
        self.sidecar.validate()?;
        self.tracing.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SidecarSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_scrape_listen")]
    pub scrape_listen: String,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for SidecarSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            scrape_listen: default_scrape_listen(),
            refresh_interval_ms: default_refresh_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SidecarSection {
    pub fn validate(&self) -> Result<()> {
        let listen = parse_addr("sidecar.listen", &self.listen)?;
        let scrape = parse_addr("sidecar.scrape_listen", &self.scrape_listen)?;
        if listen == scrape && listen.port() != 0 {
            return Err(MailmonError::Config(
                "sidecar.listen and sidecar.scrape_listen must differ".into(),
            ));
        }
        if !(100..=3_600_000).contains(&self.refresh_interval_ms) {
            return Err(MailmonError::Config(
                "sidecar.refresh_interval_ms must be between 100 and 3600000".into(),
            ));
        }
        if !(100..=300_000).contains(&self.request_timeout_ms) {
            return Err(MailmonError::Config(
                "sidecar.request_timeout_ms must be between 100 and 300000".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("sidecar.listen", &self.listen)
    }

    pub fn scrape_addr(&self) -> Result<SocketAddr> {
        parse_addr("sidecar.scrape_listen", &self.scrape_listen)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_addr(field: &str, v: &str) -> Result<SocketAddr> {
    v.parse()
        .map_err(|e| MailmonError::Config(format!("{field} must be a valid SocketAddr ({v}): {e}")))
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_scrape_listen() -> String {
    "0.0.0.0:8000".into()
}
fn default_refresh_interval_ms() -> u64 {
    5000
}
fn default_request_timeout_ms() -> u64 {
    10000
}

/// Where finished spans go.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExporterKind {
    /// OTLP over gRPC to `tracing.endpoint`.
    OtlpGrpc,
    /// Emit spans as `tracing` debug events.
    Log,
    /// No span processor; spans are dropped on end.
    None,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingSection {
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_exporter")]
    pub exporter: ExporterKind,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_export_timeout_ms")]
    pub export_timeout_ms: u64,
}

impl Default for TracingSection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            exporter: default_exporter(),
            endpoint: default_endpoint(),
            queue_capacity: default_queue_capacity(),
            max_batch_size: default_max_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            export_timeout_ms: default_export_timeout_ms(),
        }
    }
}

impl TracingSection {
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(MailmonError::Config("tracing.service_name must not be empty".into()));
        }
        // The gRPC channel is built without TLS.
        if self.exporter == ExporterKind::OtlpGrpc && !self.endpoint.starts_with("http://") {
            return Err(MailmonError::Config(
                "tracing.endpoint must be a plaintext http:// URL".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(MailmonError::Config("tracing.queue_capacity must be at least 1".into()));
        }
        if self.max_batch_size == 0 || self.max_batch_size > self.queue_capacity {
            return Err(MailmonError::Config(
                "tracing.max_batch_size must be between 1 and tracing.queue_capacity".into(),
            ));
        }
        if !(100..=60_000).contains(&self.flush_interval_ms) {
            return Err(MailmonError::Config(
                "tracing.flush_interval_ms must be between 100 and 60000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.export_timeout_ms) {
            return Err(MailmonError::Config(
                "tracing.export_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }
}

fn default_service_name() -> String {
    "mailmon".into()
}
fn default_exporter() -> ExporterKind {
    ExporterKind::OtlpGrpc
}
fn default_endpoint() -> String {
    "http://otel-collector:4317".into()
}
fn default_queue_capacity() -> usize {
    2048
}
fn default_max_batch_size() -> usize {
    512
}
fn default_flush_interval_ms() -> u64 {
    5000
}
fn default_export_timeout_ms() -> u64 {
    10000
}
