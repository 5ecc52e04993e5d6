//! mailmon sidecar library entry.
//!
//! Wires the gauge refresher, span export, and the two HTTP listeners into a
//! runnable sidecar. Consumed by the binary (`main.rs`) and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod refresher;
pub mod router;
pub mod server;
