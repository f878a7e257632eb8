//! Core shared types and identifiers

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::ServiceDescriptor;

/// Header carrying the correlation id across a request chain
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Value of `status` in a health body that counts as ready
pub const HEALTHY_MARKER: &str = "healthy";

/// Process-wide sequence so two tokens minted in the same millisecond differ
static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// Generate a uniqueness token: `<unix-millis>-<sequence>-<random suffix>`
///
/// The sequence keeps tokens distinct inside one process; the random suffix
/// keeps concurrent worker processes apart.
pub fn unique_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let sequence = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{sequence}-{}", random_suffix(SUFFIX_LEN))
}

/// Random lowercase alphanumeric string of the given length
pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Opaque id threaded through a call chain via `x-correlation-id`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(format!("corr-{}", unique_token()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated identity owned by the suite that created it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    /// The platform issues tokens without an explicit expiry
    pub expires_implicit: bool,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            expires_implicit: true,
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Body of `GET <base>/health`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY_MARKER
    }
}

/// How the last readiness attempt for a service ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 200 with a healthy status marker
    Healthy,
    /// The service answered, but not with a healthy body
    Unhealthy { status: u16, detail: String },
    /// No HTTP response at all (refused, reset, timed out)
    NeverResponded { last_error: String },
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Healthy => write!(f, "healthy"),
            ProbeOutcome::Unhealthy { status, detail } => {
                write!(f, "responded unhealthy (HTTP {status}): {detail}")
            }
            ProbeOutcome::NeverResponded { last_error } => {
                write!(f, "never responded: {last_error}")
            }
        }
    }
}

/// Result of one readiness check, discarded after the gating decision
#[derive(Clone, Debug)]
pub struct ProbeResult {
    pub service: ServiceDescriptor,
    pub ready: bool,
    pub attempts: u32,
    pub outcome: ProbeOutcome,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_unique_tokens_distinct_within_same_millisecond() {
        let tokens: HashSet<String> = (0..500).map(|_| unique_token()).collect();
        assert_eq!(tokens.len(), 500);
    }

    #[test]
    fn test_random_suffix_alphabet() {
        let suffix = random_suffix(32);
        assert_eq!(suffix.len(), 32);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_correlation_id_prefix() {
        let id = CorrelationId::generate();
        assert!(id.as_str().starts_with("corr-"));
        assert_ne!(id, CorrelationId::generate());
    }

    #[test]
    fn test_auth_session_bearer() {
        let session = AuthSession::new("abc.def", "user-1");
        assert_eq!(session.bearer(), "Bearer abc.def");
        assert!(session.expires_implicit);
    }

    #[test]
    fn test_health_report_marker() {
        let healthy: HealthReport =
            serde_json::from_str(r#"{"status":"healthy","service":"auth-service"}"#).unwrap();
        assert!(healthy.is_healthy());
        assert_eq!(healthy.service.as_deref(), Some("auth-service"));

        let degraded: HealthReport = serde_json::from_str(r#"{"status":"degraded"}"#).unwrap();
        assert!(!degraded.is_healthy());
    }
}
