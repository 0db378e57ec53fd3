//! Tracing setup for host applications
//!
//! The crate itself only emits `tracing` events; hosts decide where they
//! go. This helper installs a JSON subscriber with the usual env-filter
//! override for hosts that do not bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global JSON subscriber. Honors `RUST_LOG`; defaults to
/// debug-level events from this crate only.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidmeta=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
