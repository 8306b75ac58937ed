// src/logging.rs
//! Subscriber setup for binaries and tests.
//!
//! The library itself only emits `tracing` events; nothing is printed unless a
//! subscriber is installed.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// The filter comes from `RUST_LOG` when set and parseable, otherwise from
/// `default_directive` (e.g. `"lattice_core=debug"`). Returns `false` if a
/// global subscriber was already installed, so repeated calls are harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
