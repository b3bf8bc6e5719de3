//! Collaborator seams for the checkout flow
//!
//! The reconciler only talks to the outside world through these traits:
//! - `BillingApi` for the REST backend
//! - `PaymentConfirmer` for the embedded payment form
//! - `Navigator` for the client-side router

use async_trait::async_trait;
use serde_json::Value;

use super::error::Result;
use super::types::{
    BillingInterval, CreateSubscriptionResponse, Destination, PaymentOutcome, SubscriptionStatus,
    SubscriptionTier,
};

/// Message used when an error body carries nothing readable
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to create subscription. Please try again.";

/// Backend billing endpoints
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Fetch the tier catalog
    async fn get_subscription_tiers(&self) -> Result<Vec<SubscriptionTier>>;

    /// Fetch the current user's subscription status
    async fn get_subscription_status(&self) -> Result<SubscriptionStatus>;

    /// Create a subscription intent
    ///
    /// A success response may still lack a client secret; the caller decides
    /// what that means.
    async fn create_subscription(
        &self,
        tier_slug: &str,
        billing_interval: BillingInterval,
    ) -> Result<CreateSubscriptionResponse>;
}

/// Embedded payment form
///
/// Resolves exactly once per client secret.
#[async_trait]
pub trait PaymentConfirmer: Send + Sync {
    async fn confirm_payment(&self, client_secret: &str) -> PaymentOutcome;
}

/// Client-side router
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Pull one human-readable message out of an error body
///
/// Checks `error`, then `message`, then `detail`, then falls back to a fixed
/// string. Only non-empty string fields count.
pub fn extract_error_message(body: Option<&Value>) -> String {
    const FIELDS: [&str; 3] = ["error", "message", "detail"];

    body.and_then(|b| {
        FIELDS.iter().find_map(|field| {
            b.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    })
    .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

/// Same cascade over a raw response body
pub fn extract_error_message_from_text(text: &str) -> String {
    let parsed = serde_json::from_str::<Value>(text).ok();
    extract_error_message(parsed.as_ref())
}
