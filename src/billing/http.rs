//! REST implementation of `BillingApi`

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::api::{extract_error_message_from_text, BillingApi};
use super::config::ApiConfig;
use super::error::{BillingError, Result};
use super::types::{
    BillingInterval, CreateSubscriptionResponse, SubscriptionStatus, SubscriptionTier,
};
use crate::http_client::api_client;

const TIERS_PATH: &str = "/api/v1/billing/tiers/";
const STATUS_PATH: &str = "/api/v1/billing/status/";
const CREATE_SUBSCRIPTION_PATH: &str = "/api/v1/billing/subscriptions/create/";

/// Billing API client backed by the shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpBillingApi {
    config: ApiConfig,
}

impl HttpBillingApi {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("Accept", "application/json");
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await.map_err(BillingError::transport)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| {
                BillingError::Deserialization(format!(
                    "{} (body: {})",
                    e,
                    truncate(&body, 200)
                ))
            });
        }

        let message = extract_error_message_from_text(&body);
        debug!(status = status.as_u16(), message = %message, "Billing API error");
        Err(BillingError::Api {
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl BillingApi for HttpBillingApi {
    async fn get_subscription_tiers(&self) -> Result<Vec<SubscriptionTier>> {
        let resp = self
            .authorize(api_client().get(self.url(TIERS_PATH)))
            .send()
            .await
            .map_err(BillingError::transport)?;
        Self::handle_response(resp).await
    }

    async fn get_subscription_status(&self) -> Result<SubscriptionStatus> {
        let resp = self
            .authorize(api_client().get(self.url(STATUS_PATH)))
            .send()
            .await
            .map_err(BillingError::transport)?;
        Self::handle_response(resp).await
    }

    async fn create_subscription(
        &self,
        tier_slug: &str,
        billing_interval: BillingInterval,
    ) -> Result<CreateSubscriptionResponse> {
        let resp = self
            .authorize(api_client().post(self.url(CREATE_SUBSCRIPTION_PATH)))
            .json(&json!({
                "tierSlug": tier_slug,
                "billingInterval": billing_interval,
            }))
            .send()
            .await
            .map_err(BillingError::transport)?;
        Self::handle_response(resp).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
