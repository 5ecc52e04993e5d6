//! mailmon core: the gauge store, the text exposition renderer, and the
//! error surface shared by the sidecar.
//!
//! This crate carries no runtime or transport dependencies so the store can be
//! exercised directly from unit tests and reused by other binaries.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `MailmonError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod gauge;

/// Shared result type.
pub use error::{ErrorCode, MailmonError, Result};
pub use gauge::{GaugeDef, GaugeKind, GaugeSample, GaugeStore};
