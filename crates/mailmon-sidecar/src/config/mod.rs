//! Sidecar config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use mailmon_core::error::{MailmonError, Result};

pub use schema::{ExporterKind, SidecarConfig, SidecarSection, TracingSection};

/// Default config file name, resolved relative to the working directory.
pub const DEFAULT_PATH: &str = "mailmon.yaml";

pub fn load_from_file(path: &str) -> Result<SidecarConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MailmonError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<SidecarConfig> {
    let cfg: SidecarConfig = serde_yaml::from_str(s)
        .map_err(|e| MailmonError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the config path: explicit argument, then `MAILMON_CONFIG`, then
/// [`DEFAULT_PATH`]. Only the implicit default may be absent, in which case
/// built-in defaults apply.
pub fn load(explicit: Option<String>) -> Result<SidecarConfig> {
    if let Some(path) = explicit.or_else(|| std::env::var("MAILMON_CONFIG").ok()) {
        return load_from_file(&path);
    }
    match fs::metadata(Path::new(DEFAULT_PATH)) {
        Ok(_) => load_from_file(DEFAULT_PATH),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = DEFAULT_PATH, "no config file, using defaults");
            let cfg = SidecarConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) => Err(MailmonError::Config(format!("stat {DEFAULT_PATH} failed: {e}"))),
    }
}
