// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::ClientError;
use std::env;
use std::time::Duration;

pub const DEFAULT_COLLECTOR_HOST: &str = "w.apiv3.errplane.com";
pub const DEFAULT_AGGREGATOR_ADDR: &str = "udp.apiv3.errplane.com:8126";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Client configuration. Consumed by [`crate::Errplane::new`] and never
/// mutated afterwards, so the worker reads it without synchronization.
#[derive(Debug, Clone)]
pub struct Config {
    /// Application key from the settings page.
    pub app_key: String,
    /// Deployment environment (e.g., "staging", "production").
    pub environment: String,
    /// API key used to authenticate writes.
    pub api_key: String,
    /// Collector host for the reliable HTTP channel.
    pub collector_host: String,
    /// Aggregator host:port for the connectionless UDP channel.
    pub aggregator_addr: String,
    /// URL scheme for the collector ("https", or "http" against test servers).
    pub scheme: String,
    /// HTTPS proxy URL for the reliable channel.
    pub https_proxy: Option<String>,
    /// Connect/IO timeout applied to both channels.
    pub timeout: Duration,
}

impl Config {
    pub fn new(app_key: &str, environment: &str, api_key: &str) -> Self {
        Self {
            app_key: app_key.to_string(),
            environment: environment.to_string(),
            api_key: api_key.to_string(),
            collector_host: DEFAULT_COLLECTOR_HOST.to_string(),
            aggregator_addr: DEFAULT_AGGREGATOR_ADDR.to_string(),
            scheme: "https".to_string(),
            https_proxy: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create configuration from `ERRPLANE_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let app_key = env::var("ERRPLANE_APP_KEY").unwrap_or_default();
        let environment = env::var("ERRPLANE_ENVIRONMENT").unwrap_or_default();
        let api_key = env::var("ERRPLANE_API_KEY").unwrap_or_default();

        let mut config = Self::new(&app_key, &environment, &api_key);
        if let Ok(host) = env::var("ERRPLANE_COLLECTOR_HOST") {
            config.collector_host = host;
        }
        if let Ok(addr) = env::var("ERRPLANE_AGGREGATOR_ADDR") {
            config.aggregator_addr = addr;
        }
        config.https_proxy = env::var("ERRPLANE_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        if let Some(ms) = env::var("ERRPLANE_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_collector_host(mut self, host: &str) -> Self {
        self.collector_host = host.to_string();
        self
    }

    pub fn with_aggregator_addr(mut self, addr: &str) -> Self {
        self.aggregator_addr = addr.to_string();
        self
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub fn with_proxy(mut self, proxy_url: &str) -> Self {
        self.https_proxy = Some(proxy_url.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "API key cannot be empty".to_string(),
            ));
        }
        if self.app_key.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "application key cannot be empty".to_string(),
            ));
        }
        if self.collector_host.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "collector host cannot be empty".to_string(),
            ));
        }
        if self.aggregator_addr.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "aggregator address cannot be empty".to_string(),
            ));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(ClientError::InvalidConfig(format!(
                "invalid scheme '{}'. Must be one of: http, https",
                self.scheme
            )));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The database identifier writes are routed to.
    pub fn database(&self) -> String {
        format!("{}{}", self.app_key, self.environment)
    }

    /// Full collector URL. The API key travels here as a query parameter,
    /// not in request bodies.
    pub fn collector_url(&self) -> String {
        format!(
            "{}://{}/databases/{}/points?api_key={}",
            self.scheme,
            self.collector_host,
            self.database(),
            self.api_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::new("app4you2love", "staging", "some_key")
    }

    #[test]
    fn test_new_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = test_config();
        assert_eq!(config.collector_host, DEFAULT_COLLECTOR_HOST);
        assert_eq!(config.aggregator_addr, DEFAULT_AGGREGATOR_ADDR);
        assert_eq!(config.scheme, "https");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.https_proxy.is_none());
    }

    #[test]
    fn test_database_concatenates_app_and_environment() {
        assert_eq!(test_config().database(), "app4you2lovestaging");
    }

    #[test]
    fn test_collector_url() {
        let config = test_config();
        assert_eq!(
            config.collector_url(),
            "https://w.apiv3.errplane.com/databases/app4you2lovestaging/points?api_key=some_key"
        );
    }

    #[test]
    fn test_collector_url_with_overrides() {
        let config = test_config()
            .with_scheme("http")
            .with_collector_host("127.0.0.1:8080");
        assert_eq!(
            config.collector_url(),
            "http://127.0.0.1:8080/databases/app4you2lovestaging/points?api_key=some_key"
        );
    }

    #[test]
    fn test_validate_empty_api_key() {
        let config = Config::new("app4you2love", "staging", "");
        assert!(config.validate().is_err());

        let config = Config::new("app4you2love", "staging", "   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_app_key() {
        let config = Config::new("", "staging", "some_key");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_scheme() {
        let config = test_config().with_scheme("ftp");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = test_config().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_proxy() {
        let config = test_config().with_proxy("http://localhost:3128");
        assert_eq!(
            config.https_proxy.as_deref(),
            Some("http://localhost:3128")
        );
        assert!(config.validate().is_ok());
    }
}
