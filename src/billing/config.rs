//! Checkout configuration
//!
//! Defaults match the production checkout page. `from_env` reads overrides
//! after `.env` has been loaded with dotenvy.

use std::time::Duration;

use super::error::{BillingError, Result};

/// Default number of status polls after payment confirmation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default delay before each status poll
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Poll loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Maximum status polls before soft-degrading to the pending page
    pub max_attempts: u32,
    /// Fixed delay before every poll (no backoff)
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ReconcilerConfig {
    /// Read `ALLTHRIVE_POLL_MAX_ATTEMPTS` / `ALLTHRIVE_POLL_INTERVAL_MS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(attempts) = env_parse::<u32>("ALLTHRIVE_POLL_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(BillingError::Config(
                    "ALLTHRIVE_POLL_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            config.max_attempts = attempts;
        }
        if let Some(ms) = env_parse::<u64>("ALLTHRIVE_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the All Thrive API (default: http://localhost:8000)
    pub base_url: String,
    /// Optional bearer token; cookie auth is used otherwise
    pub auth_token: Option<String>,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Read `ALLTHRIVE_API_URL`, `ALLTHRIVE_API_TOKEN`, `ALLTHRIVE_API_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("ALLTHRIVE_API_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BillingError::Config(format!(
                    "ALLTHRIVE_API_URL must be an http(s) URL, got {}",
                    url
                )));
            }
            config.base_url = url.trim_end_matches('/').to_string();
        }
        config.auth_token = std::env::var("ALLTHRIVE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        if let Some(secs) = env_parse::<u64>("ALLTHRIVE_API_TIMEOUT_SECS")? {
            config.timeout_secs = secs;
        }
        Ok(config)
    }
}

/// Load `.env` from the working directory, falling back to the parent
pub fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| BillingError::Config(format!("{} is not a valid number: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.poll_interval, Duration::from_secs(1));

        let api = ApiConfig::default();
        assert_eq!(api.timeout_secs, 30);
        assert!(api.auth_token.is_none());
    }

    // Env vars are process-wide, so every env-reading assertion lives in one test
    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("ALLTHRIVE_POLL_MAX_ATTEMPTS", "4");
        std::env::set_var("ALLTHRIVE_POLL_INTERVAL_MS", "250");
        let config = ReconcilerConfig::from_env().unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.poll_interval, Duration::from_millis(250));

        std::env::set_var("ALLTHRIVE_POLL_MAX_ATTEMPTS", "0");
        assert!(ReconcilerConfig::from_env().is_err());

        std::env::set_var("ALLTHRIVE_POLL_MAX_ATTEMPTS", "ten");
        assert!(matches!(
            ReconcilerConfig::from_env(),
            Err(BillingError::Config(_))
        ));
        std::env::remove_var("ALLTHRIVE_POLL_MAX_ATTEMPTS");
        std::env::remove_var("ALLTHRIVE_POLL_INTERVAL_MS");

        std::env::set_var("ALLTHRIVE_API_URL", "https://api.allthrive.ai/");
        std::env::set_var("ALLTHRIVE_API_TOKEN", "tok_abc");
        let api = ApiConfig::from_env().unwrap();
        assert_eq!(api.base_url, "https://api.allthrive.ai");
        assert_eq!(api.auth_token.as_deref(), Some("tok_abc"));

        std::env::set_var("ALLTHRIVE_API_URL", "ftp://nope");
        assert!(ApiConfig::from_env().is_err());
        std::env::remove_var("ALLTHRIVE_API_URL");
        std::env::remove_var("ALLTHRIVE_API_TOKEN");
    }
}
