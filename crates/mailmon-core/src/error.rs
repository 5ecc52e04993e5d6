//! Shared error type across mailmon crates.

use thiserror::Error;

/// Stable error codes surfaced in HTTP error bodies and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Gauge name outside the closed set.
    UnknownGauge,
    /// Two gauge definitions share a name.
    DuplicateGauge,
    /// Exposition rendering failed.
    Encoding,
    /// Span export failed.
    Export,
    /// Listener could not bind.
    Bind,
    /// Invalid configuration.
    Config,
    /// Internal server error.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownGauge => "UNKNOWN_GAUGE",
            ErrorCode::DuplicateGauge => "DUPLICATE_GAUGE",
            ErrorCode::Encoding => "ENCODING",
            ErrorCode::Export => "EXPORT",
            ErrorCode::Bind => "BIND",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MailmonError>;

/// Unified error type used by core and sidecar.
#[derive(Debug, Error)]
pub enum MailmonError {
    #[error("unknown gauge: {0}")]
    UnknownGauge(String),
    #[error("duplicate gauge: {0}")]
    DuplicateGauge(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("span export failed: {0}")]
    Export(String),
    #[error("bind {addr} failed: {reason}")]
    Bind { addr: String, reason: String },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MailmonError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MailmonError::UnknownGauge(_) => ErrorCode::UnknownGauge,
            MailmonError::DuplicateGauge(_) => ErrorCode::DuplicateGauge,
            MailmonError::Encoding(_) => ErrorCode::Encoding,
            MailmonError::Export(_) => ErrorCode::Export,
            MailmonError::Bind { .. } => ErrorCode::Bind,
            MailmonError::Config(_) => ErrorCode::Config,
            MailmonError::Internal(_) => ErrorCode::Internal,
        }
    }
}
