//! Top-level facade crate for mailmon.
//!
//! Re-exports the gauge primitives and the sidecar library so users can depend on a single crate.

pub mod core {
    pub use mailmon_core::*;
}

pub mod sidecar {
    pub use mailmon_sidecar::*;
}
