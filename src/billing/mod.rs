//! Billing module for subscription checkout
//!
//! This module handles:
//! - Tier catalog and subscription status read models
//! - Subscription intent creation with error message extraction
//! - Activation polling after payment confirmation
//! - Classification of checkout failures for display

mod abort;
mod api;
mod classifier;
mod config;
mod error;
mod http;
mod poller;
mod reconciler;
mod types;


pub use abort::{AbortFlag, TeardownHandle};
pub use api::{
    extract_error_message, extract_error_message_from_text, BillingApi, Navigator,
    PaymentConfirmer, FALLBACK_ERROR_MESSAGE,
};
pub use classifier::{classify_failure, FailurePresentation};
pub use config::{
    load_dotenv, ApiConfig, ReconcilerConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};
pub use error::{BillingError, Result};
pub use http::HttpBillingApi;
pub use poller::{poll_until_active, PollOutcome};
pub use reconciler::{
    CheckoutContext, CheckoutFailure, CheckoutPhase, Resolution, SubscriptionReconciler,
};
pub use types::{
    BillingInterval, CreateSubscriptionResponse, Destination, PaymentOutcome,
    ReconciliationAttempt, StatusKind, SubscriptionIntent, SubscriptionStatus, SubscriptionTier,
};
