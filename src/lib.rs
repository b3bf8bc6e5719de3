//! All Thrive checkout
//!
//! Client-side orchestration of subscription purchases: create a payment
//! intent, hand it to the payment form, then reconcile with the backend until
//! the subscription is observed active.

pub mod billing;
mod http_client;

pub use billing::*;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// Honors `RUST_LOG`; defaults to warn for dependencies and info for this
/// crate. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,allthrive_checkout=info")),
        )
        .try_init();
}
