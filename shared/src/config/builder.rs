//! Harness Configuration Builder
//!
//! Provides a flexible builder pattern for constructing harness configurations
//! without touching the process environment (tests, embedding).

use super::{HarnessConfig, ServiceDescriptor};
use std::time::Duration;

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Register or replace a service under the given key
    pub fn service<S: Into<String>>(mut self, key: S, descriptor: ServiceDescriptor) -> Self {
        self.config.services.insert(key.into(), descriptor);
        self
    }

    /// Point an existing service at a different base URL
    pub fn service_url<S: Into<String>>(mut self, key: &str, base_url: S) -> Self {
        if let Some(descriptor) = self.config.services.get_mut(key) {
            descriptor.base_url = base_url.into();
        }
        self
    }

    /// Set the keys of the services that gate a run
    pub fn readiness_services<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.readiness_services = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set maximum readiness attempts per service
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.readiness.max_retries = max_retries;
        self
    }

    /// Set spacing between readiness attempts
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.readiness.interval = interval;
        self
    }

    /// Set the timeout of a single readiness attempt
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness.attempt_timeout = timeout;
        self
    }

    /// Set the default timeout applied to every outbound request
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn bff_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.bff_url = url.into();
        self
    }

    pub fn mailpit_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.mailpit_api_url = url.into();
        self
    }

    pub fn message_broker_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.message_broker_api_key = key.into();
        self
    }

    /// Set the number of concurrent users in load suites
    pub fn concurrent_users(mut self, count: usize) -> Self {
        self.config.perf.concurrent_users = count;
        self
    }

    /// Set how long the sustained load suite keeps issuing requests
    pub fn perf_duration(mut self, duration: Duration) -> Self {
        self.config.perf.duration = duration;
        self
    }

    pub fn cleanup_after_tests(mut self, enabled: bool) -> Self {
        self.config.cleanup_after_tests = enabled;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Build the configuration
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = HarnessConfig::builder()
            .service_url("auth", "http://127.0.0.1:4100")
            .service("ledger", ServiceDescriptor::new("Ledger", "http://127.0.0.1:4200", "/status"))
            .readiness_services(["auth", "ledger"])
            .max_retries(3)
            .retry_interval(Duration::from_millis(10))
            .build();

        assert_eq!(config.service("auth").unwrap().base_url, "http://127.0.0.1:4100");
        assert_eq!(config.readiness.max_retries, 3);
        let gated = config.readiness_descriptors();
        assert_eq!(gated.len(), 2);
        assert_eq!(gated[1].health_url(), "http://127.0.0.1:4200/status");
    }
}
