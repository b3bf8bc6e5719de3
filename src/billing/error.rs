//! Error types for checkout and subscription activation
//!
//! Every variant is handled inside the reconciler and translated into a
//! phase or a navigation. The types exist so collaborators can report
//! failures with enough structure to classify them.

use thiserror::Error;

use super::api::FALLBACK_ERROR_MESSAGE;

/// Result alias used across the billing module
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors produced while preparing or confirming a subscription
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// No tier was passed to checkout
    #[error("No plan selected")]
    NoTierSelected,

    /// The requested tier is not in the catalog
    #[error("Unknown plan: {0}")]
    UnknownTier(String),

    /// The user already holds an active subscription to the tier
    #[error("You already have an active subscription to this plan.")]
    AlreadySubscribed { tier_slug: String },

    /// The backend accepted the request but returned no client secret
    #[error("Failed to initialize payment: missing client secret")]
    InitializationFailure,

    /// The backend rejected the request; message already extracted from the body
    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    /// Network-level failure (DNS, connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("Unexpected response from billing API: {0}")]
    Deserialization(String),

    /// Client configuration is invalid
    #[error("Invalid billing configuration: {0}")]
    Config(String),
}

impl BillingError {
    /// Create a transport error from a reqwest error
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }

    /// Message shown on the checkout page
    ///
    /// Network and decoding failures carry request URLs and raw bodies, so
    /// they collapse to the generic fallback. Log the error itself for detail.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) | Self::Deserialization(_) => FALLBACK_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
