//! Billing data types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Billing interval for a subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    #[default]
    Monthly,
    Annual,
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Annual => write!(f, "annual"),
        }
    }
}

impl std::str::FromStr for BillingInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "annual" | "annually" | "yearly" | "year" => Ok(Self::Annual),
            other => Err(format!("Unknown billing interval: {}", other)),
        }
    }
}

/// Entry in the subscription tier catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTier {
    pub slug: String,
    pub name: String,
    /// Monthly price as a display string (e.g. "15.00")
    #[serde(alias = "price_monthly", default)]
    pub price_monthly: String,
    #[serde(alias = "price_annual", default)]
    pub price_annual: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl SubscriptionTier {
    /// Price shown for the given interval
    pub fn price_for(&self, interval: BillingInterval) -> &str {
        match interval {
            BillingInterval::Monthly => &self.price_monthly,
            BillingInterval::Annual => &self.price_annual,
        }
    }
}

/// Lifecycle status reported by the backend
///
/// Unknown values are kept verbatim in `Other` so a newer backend does not
/// break deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusKind {
    Active,
    Pending,
    Trialing,
    PastDue,
    Incomplete,
    Canceled,
    #[default]
    None,
    Other(String),
}

impl From<String> for StatusKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "pending" => Self::Pending,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "incomplete" => Self::Incomplete,
            "canceled" | "cancelled" => Self::Canceled,
            "none" | "" => Self::None,
            _ => Self::Other(value),
        }
    }
}

impl From<StatusKind> for String {
    fn from(value: StatusKind) -> Self {
        match value {
            StatusKind::Active => "active".to_string(),
            StatusKind::Pending => "pending".to_string(),
            StatusKind::Trialing => "trialing".to_string(),
            StatusKind::PastDue => "past_due".to_string(),
            StatusKind::Incomplete => "incomplete".to_string(),
            StatusKind::Canceled => "canceled".to_string(),
            StatusKind::None => "none".to_string(),
            StatusKind::Other(s) => s,
        }
    }
}

/// Subscription status read model, always fetched from the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(alias = "tier_slug", default)]
    pub tier_slug: Option<String>,
    #[serde(alias = "has_active_subscription", default)]
    pub has_active_subscription: bool,
    #[serde(alias = "subscription_status", default)]
    pub subscription_status: StatusKind,
}

impl SubscriptionStatus {
    /// Activation is only observed once both the flag and the status agree
    pub fn is_active(&self) -> bool {
        self.has_active_subscription && self.subscription_status == StatusKind::Active
    }

    /// Whether the user already holds an active subscription to `tier_slug`
    pub fn is_subscribed_to(&self, tier_slug: &str) -> bool {
        self.has_active_subscription && self.tier_slug.as_deref() == Some(tier_slug)
    }
}

/// Body returned by the subscription creation endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionResponse {
    #[serde(alias = "client_secret", default)]
    pub client_secret: Option<String>,
    #[serde(alias = "subscription_id", default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// A payment setup for one tier/interval pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIntent {
    pub tier_slug: String,
    pub billing_interval: BillingInterval,
    pub client_secret: Option<String>,
}

impl SubscriptionIntent {
    /// An intent is live while it holds a usable client secret
    pub fn is_live(&self) -> bool {
        self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// One iteration of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationAttempt {
    pub attempt_number: u32,
    pub elapsed: Duration,
}

/// Outcome reported by the payment collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed(String),
}

/// Navigation targets the reconciler can resolve to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Destination {
    /// Subscription confirmed active
    Success { tier_slug: String },
    /// Payment accepted but activation not observed yet
    Pending { tier_slug: String },
    BillingSettings,
    PlanSelection,
}

impl Destination {
    /// Route the hosting app would push for this destination
    pub fn path(&self) -> String {
        match self {
            Self::Success { tier_slug } => format!("/checkout/success?tier={}", tier_slug),
            Self::Pending { tier_slug } => {
                format!("/checkout/success?tier={}&pending=true", tier_slug)
            }
            Self::BillingSettings => "/settings/billing".to_string(),
            Self::PlanSelection => "/pricing".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accepts_both_key_styles() {
        let camel: SubscriptionStatus = serde_json::from_str(
            r#"{"tierSlug":"pro_learn","hasActiveSubscription":true,"subscriptionStatus":"active"}"#,
        )
        .unwrap();
        let snake: SubscriptionStatus = serde_json::from_str(
            r#"{"tier_slug":"pro_learn","has_active_subscription":true,"subscription_status":"active"}"#,
        )
        .unwrap();
        assert_eq!(camel, snake);
        assert!(camel.is_active());
    }

    #[test]
    fn test_active_requires_flag_and_status() {
        let status = SubscriptionStatus {
            tier_slug: Some("pro_learn".into()),
            has_active_subscription: true,
            subscription_status: StatusKind::Pending,
        };
        assert!(!status.is_active());

        let status = SubscriptionStatus {
            has_active_subscription: false,
            subscription_status: StatusKind::Active,
            ..Default::default()
        };
        assert!(!status.is_active());
    }

    #[test]
    fn test_missing_status_fields_default() {
        let status: SubscriptionStatus =
            serde_json::from_str(r#"{"hasActiveSubscription":false}"#).unwrap();
        assert_eq!(status.subscription_status, StatusKind::None);
        assert!(status.tier_slug.is_none());
    }

    #[test]
    fn test_unknown_status_kept() {
        let status: SubscriptionStatus =
            serde_json::from_str(r#"{"subscriptionStatus":"paused"}"#).unwrap();
        assert_eq!(status.subscription_status, StatusKind::Other("paused".into()));
    }

    #[test]
    fn test_intent_liveness() {
        let mut intent = SubscriptionIntent {
            tier_slug: "pro_learn".into(),
            billing_interval: BillingInterval::Monthly,
            client_secret: Some(String::new()),
        };
        assert!(!intent.is_live());
        intent.client_secret = Some("sk_test_123".into());
        assert!(intent.is_live());
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("Annual".parse::<BillingInterval>(), Ok(BillingInterval::Annual));
        assert_eq!("monthly".parse::<BillingInterval>(), Ok(BillingInterval::Monthly));
        assert!("weekly".parse::<BillingInterval>().is_err());
    }

    #[test]
    fn test_tier_price_for_interval() {
        let tier: SubscriptionTier = serde_json::from_str(
            r#"{"slug":"pro_learn","name":"Pro Learn","priceMonthly":"15.00","priceAnnual":"150.00"}"#,
        )
        .unwrap();
        assert_eq!(tier.price_for(BillingInterval::Monthly), "15.00");
        assert_eq!(tier.price_for(BillingInterval::Annual), "150.00");
        assert!(tier.features.is_empty());
    }
}
