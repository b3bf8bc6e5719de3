//! Failure presentation classifier
//!
//! Maps a checkout failure message onto one of three presentations. Checked
//! in order, first match wins:
//! 1. already subscribed (soft success, link to billing settings)
//! 2. initialization failure (retry)
//! 3. generic failure (retry or go back)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::types::SubscriptionStatus;

static ALREADY_SUBSCRIBED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)already\s+(have|has|own)\s+(an?\s+)?(active\s+)?subscription|already\s+subscribed|already\s+on\s+this\s+plan|existing\s+active\s+subscription",
    )
    .expect("Invalid already-subscribed pattern")
});

static INITIALIZATION_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)client[\s_-]*secret|failed\s+to\s+initiali[sz]e|initiali[sz]ation\s+fail|payment\s+setup|setup\s+(failed|intent)",
    )
    .expect("Invalid initialization pattern")
});

/// How a failed checkout is shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePresentation {
    /// Not an error banner; offers navigation to billing management
    AlreadySubscribed,
    /// Retry discards the current intent and requests a new one
    InitializationFailure,
    /// Raw message with retry and go-back actions
    Generic,
}

impl FailurePresentation {
    /// Whether the UI should render an error banner
    pub fn is_error(self) -> bool {
        !matches!(self, Self::AlreadySubscribed)
    }

    /// Whether a retry action is offered
    pub fn offers_retry(self) -> bool {
        !matches!(self, Self::AlreadySubscribed)
    }
}

/// Classify a failure message
///
/// `status` is the independently fetched subscription status, when known.
pub fn classify_failure(
    message: &str,
    status: Option<&SubscriptionStatus>,
    requested_tier: &str,
) -> FailurePresentation {
    let subscribed_to_requested = status.is_some_and(|s| s.is_subscribed_to(requested_tier));

    if ALREADY_SUBSCRIBED.is_match(message) || subscribed_to_requested {
        FailurePresentation::AlreadySubscribed
    } else if INITIALIZATION_FAILURE.is_match(message) {
        FailurePresentation::InitializationFailure
    } else {
        FailurePresentation::Generic
    }
}
