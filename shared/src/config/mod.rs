//! Harness Configuration
//!
//! One immutable [`HarnessConfig`] is built at process entry (from the
//! environment, an env file, or the builder) and handed to the prober, the
//! HTTP client and the auth helper. Nothing reads the environment after that.

pub mod builder;
pub mod catalog;

pub use builder::HarnessConfigBuilder;
pub use catalog::{CatalogEntry, SERVICE_CATALOG};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{SharedError, SharedResult};

pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_BFF_URL: &str = "http://localhost:3100";
pub const DEFAULT_MAILPIT_API_URL: &str = "http://localhost:8025/api/v1";
pub const DEFAULT_MESSAGE_BROKER_API_KEY: &str = "7K9mP2xR5wN8qT4vL6jH3sF1dG9bY0zA";
pub const DEFAULT_READINESS_SERVICES: &[&str] = &["auth", "user", "message-broker"];

/// A dependent service and where its health endpoint lives
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub base_url: String,
    pub health_path: String,
    /// Full health URL; replaces `base_url` + `health_path` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_url_override: Option<String>,
}

impl ServiceDescriptor {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        health_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            health_path: health_path.into(),
            health_url_override: None,
        }
    }

    pub fn with_health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url_override = Some(url.into());
        self
    }

    pub fn health_url(&self) -> String {
        match &self.health_url_override {
            Some(url) => url.clone(),
            None => self.endpoint(&self.health_path),
        }
    }

    /// Join a path onto the base URL with exactly one slash between them
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Readiness probing budget
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessSettings {
    pub max_retries: u32,
    pub interval: Duration,
    pub attempt_timeout: Duration,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            max_retries: 30,
            interval: Duration::from_millis(2000),
            attempt_timeout: Duration::from_millis(5000),
        }
    }
}

/// Load test parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerfSettings {
    pub concurrent_users: usize,
    pub duration: Duration,
}

impl Default for PerfSettings {
    fn default() -> Self {
        Self {
            concurrent_users: 10,
            duration: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Catalogued services keyed by their short key (`auth`, `user`, ...)
    pub services: BTreeMap<String, ServiceDescriptor>,
    /// Keys of the services that gate a run
    pub readiness_services: Vec<String>,
    pub bff_url: String,
    pub mailpit_api_url: String,
    pub message_broker_api_key: String,
    pub request_timeout: Duration,
    pub readiness: ReadinessSettings,
    pub perf: PerfSettings,
    pub cleanup_after_tests: bool,
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let services = SERVICE_CATALOG
            .iter()
            .map(|entry| (entry.key.to_string(), entry.default_descriptor()))
            .collect();

        Self {
            services,
            readiness_services: DEFAULT_READINESS_SERVICES.iter().map(|k| k.to_string()).collect(),
            bff_url: DEFAULT_BFF_URL.to_string(),
            mailpit_api_url: DEFAULT_MAILPIT_API_URL.to_string(),
            message_broker_api_key: DEFAULT_MESSAGE_BROKER_API_KEY.to_string(),
            request_timeout: Duration::from_millis(30_000),
            readiness: ReadinessSettings::default(),
            perf: PerfSettings::default(),
            cleanup_after_tests: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }

    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> SharedResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read an env file and fill the gaps the process environment leaves
    ///
    /// Variables already set in the process win, matching dotenv semantics.
    pub fn from_env_file(path: &Path) -> SharedResult<Self> {
        let file_vars = read_env_file(path)?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> SharedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for entry in SERVICE_CATALOG {
            let base_url = lookup(&entry.url_var()).unwrap_or_else(|| entry.default_url.to_string());
            let health_path =
                lookup(&entry.health_path_var()).unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string());
            let mut descriptor = ServiceDescriptor::new(entry.name, base_url, health_path);
            if let Some(url) = lookup(&entry.health_url_var()) {
                descriptor = descriptor.with_health_url(url);
            }
            config.services.insert(entry.key.to_string(), descriptor);
        }

        if let Some(keys) = lookup("READINESS_SERVICES") {
            config.readiness_services = keys
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }
        for key in &config.readiness_services {
            if !config.services.contains_key(key) {
                return Err(SharedError::UnknownService { key: key.clone() });
            }
        }

        if let Some(url) = lookup("BFF_URL") {
            config.bff_url = url;
        }
        if let Some(url) = lookup("MAILPIT_API_URL") {
            config.mailpit_api_url = url;
        }
        if let Some(key) = lookup("MESSAGE_BROKER_API_KEY") {
            config.message_broker_api_key = key;
        }

        config.request_timeout = parse_millis(&lookup, "TEST_TIMEOUT", config.request_timeout)?;
        config.readiness.max_retries =
            parse_bounded(&lookup, "READINESS_MAX_RETRIES", config.readiness.max_retries)?;
        config.readiness.interval =
            parse_millis(&lookup, "READINESS_INTERVAL_MS", config.readiness.interval)?;
        config.readiness.attempt_timeout =
            parse_millis(&lookup, "READINESS_ATTEMPT_TIMEOUT_MS", config.readiness.attempt_timeout)?;

        config.perf.concurrent_users =
            parse_bounded(&lookup, "PERF_CONCURRENT_USERS", config.perf.concurrent_users)?;
        config.perf.duration = Duration::from_secs(parse_number(
            &lookup,
            "PERF_TEST_DURATION_SECONDS",
            config.perf.duration.as_secs(),
        )?);

        config.cleanup_after_tests = parse_flag(&lookup, "CLEANUP_AFTER_TESTS");
        config.verbose = parse_flag(&lookup, "VERBOSE");

        if config.readiness.max_retries == 0 {
            return Err(SharedError::InvalidConfig {
                field: "READINESS_MAX_RETRIES".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(config)
    }

    /// Look up a catalogued service by key
    pub fn service(&self, key: &str) -> SharedResult<&ServiceDescriptor> {
        self.services
            .get(key)
            .ok_or_else(|| SharedError::UnknownService { key: key.to_string() })
    }

    /// Descriptors of the services that gate a run, in configured order
    pub fn readiness_descriptors(&self) -> Vec<ServiceDescriptor> {
        self.readiness_services
            .iter()
            .filter_map(|key| self.services.get(key).cloned())
            .collect()
    }
}

fn read_env_file(path: &Path) -> SharedResult<HashMap<String, String>> {
    let to_error = |message: String| SharedError::EnvFile {
        path: path.display().to_string(),
        message,
    };

    let iter = dotenv::from_path_iter(path).map_err(|e| to_error(e.to_string()))?;
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| to_error(e.to_string()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn parse_number<F>(lookup: &F, field: &str, default: u64) -> SharedResult<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(field) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| SharedError::InvalidConfig {
            field: field.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Parse into a narrower integer, rejecting values that do not fit
fn parse_bounded<F, T>(lookup: &F, field: &str, default: T) -> SharedResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: TryFrom<u64> + Copy,
{
    match lookup(field) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| SharedError::InvalidConfig {
                field: field.to_string(),
                value: raw,
            }),
        None => Ok(default),
    }
}

fn parse_millis<F>(lookup: &F, field: &str, default: Duration) -> SharedResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_number(lookup, field, default.as_millis() as u64).map(Duration::from_millis)
}

fn parse_flag<F>(lookup: &F, field: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    matches!(lookup(field).as_deref().map(str::trim), Some("true") | Some("1"))
}
