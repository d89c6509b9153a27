use crate::error::{MarketError, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub search_debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // .env is optional

        let api_url = std::env::var("MARKET_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_url.is_empty() {
            return Err(MarketError::Config("MARKET_API_URL is empty".to_string()));
        }

        Ok(Self {
            api_url,
            poll_interval: Duration::from_secs(non_zero(
                "MARKET_POLL_INTERVAL_SECS",
                parse_var("MARKET_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            )?),
            search_debounce: Duration::from_millis(parse_var(
                "MARKET_SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )?),
            request_timeout: Duration::from_secs(non_zero(
                "MARKET_REQUEST_TIMEOUT_SECS",
                parse_var("MARKET_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            )?),
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MarketError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Periods fed to `tokio::time::interval` and the HTTP timeout cannot be zero.
fn non_zero(name: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(MarketError::Config(format!("{} must be > 0", name)));
    }
    Ok(value)
}

/// Credentials the watch binary logs in with.
pub fn credentials_from_env() -> Result<(String, String)> {
    let email = std::env::var("MARKET_EMAIL")
        .map_err(|_| MarketError::Config("MARKET_EMAIL must be set".to_string()))?;
    let password = std::env::var("MARKET_PASSWORD")
        .map_err(|_| MarketError::Config("MARKET_PASSWORD must be set".to_string()))?;
    Ok((email, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_api_url_strips_trailing_slash() {
        let config = ClientConfig::default().with_api_url("http://example.test/api/");
        assert_eq!(config.api_url, "http://example.test/api");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.search_debounce, Duration::from_millis(300));
    }

    #[test]
    fn zero_periods_are_rejected() {
        assert_eq!(non_zero("MARKET_POLL_INTERVAL_SECS", 5).unwrap(), 5);
        match non_zero("MARKET_POLL_INTERVAL_SECS", 0) {
            Err(MarketError::Config(msg)) => assert_eq!(msg, "MARKET_POLL_INTERVAL_SECS must be > 0"),
            other => panic!("unexpected: {:?}", other),
        }

        std::env::set_var("MARKET_POLL_INTERVAL_SECS", "0");
        let from_env = ClientConfig::from_env();
        std::env::remove_var("MARKET_POLL_INTERVAL_SECS");
        assert!(matches!(from_env, Err(MarketError::Config(_))));

        assert!(matches!(
            non_zero("MARKET_REQUEST_TIMEOUT_SECS", 0),
            Err(MarketError::Config(_))
        ));
    }
}
