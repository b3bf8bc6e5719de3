//! Shared HTTP client
//!
//! One lazily built `reqwest::Client` reused for every billing request, so
//! status polls share pooled connections instead of reconnecting each second.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// Global HTTP client for All Thrive API calls
///
/// - 30s timeout (per request; callers may override)
/// - small idle pool, the checkout flow only ever has one request in flight
pub static API_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("Failed to build tuned HTTP client: {}. Using defaults.", e);
            Client::new()
        })
});

/// Get the global API client
#[inline]
pub fn api_client() -> &'static Client {
    &API_CLIENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_singleton() {
        let client1 = api_client();
        let client2 = api_client();
        assert!(std::ptr::eq(client1, client2));
    }
}
