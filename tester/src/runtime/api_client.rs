//! HTTP Client Wrapper
//!
//! Thin, uniform wrapper around outbound calls to the platform. Adds the
//! bearer token, extra headers, the correlation id and an explicit timeout to
//! every request, and surfaces failures without hiding the upstream status.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{AuthSession, CORRELATION_HEADER, CorrelationId, HarnessConfig};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a single outbound call
///
/// `Status` always carries the original status code and body so callers can
/// branch on exact codes; `Timeout` and `Connection` mean no response arrived.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} {url} returned HTTP {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: Value,
        headers: HeaderMap,
    },

    #[error("{method} {url} timed out after {after:?}")]
    Timeout {
        method: String,
        url: String,
        after: Duration,
    },

    #[error("{method} {url} connection failed: {message}")]
    Connection {
        method: String,
        url: String,
        message: String,
    },

    #[error("Could not build request for {url}: {message}")]
    Request { url: String, message: String },
}

impl ApiError {
    /// Upstream HTTP status, when a response arrived
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream response body, when a response arrived
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// `error` field of the upstream body rendered as text
    pub fn error_message(&self) -> Option<String> {
        self.body().map(|body| match body.get("error") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    /// True when nothing answered: refused, reset or timed out
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Connection { .. })
    }
}

/// Successful (2xx) response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
    pub headers: HeaderMap,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Correlation id echoed back by the service, if it echoes at all
    pub fn correlation_id(&self) -> Option<&str> {
        self.header(CORRELATION_HEADER)
    }

    /// Deserialize the body into a typed value
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub token: Option<String>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub correlation_id: Option<CorrelationId>,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the session's bearer token
    pub fn authenticated(session: &AuthSession) -> Self {
        Self::new().token(session.token.clone())
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }
}

enum Body {
    Json(Value),
    Raw { content: String, content_type: String },
}

/// HTTP client shared by the prober, the auth helper and every suite
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ApiClient {
    /// Create a client whose calls time out after `default_timeout` unless overridden
    pub fn new(default_timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()
            .map_err(|e| ApiError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    pub fn from_config(config: &HarnessConfig) -> ApiResult<Self> {
        Self::new(config.request_timeout)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> ApiResult<ApiResponse> {
        self.send(Method::GET, url, None, options).await
    }

    pub async fn delete(&self, url: &str, options: &RequestOptions) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, url, None, options).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let body = to_json(url, body)?;
        self.send(Method::POST, url, Some(Body::Json(body)), options).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let body = to_json(url, body)?;
        self.send(Method::PUT, url, Some(Body::Json(body)), options).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let body = to_json(url, body)?;
        self.send(Method::PATCH, url, Some(Body::Json(body)), options).await
    }

    /// POST a body verbatim, e.g. malformed JSON for negative tests
    pub async fn post_raw(
        &self,
        url: &str,
        content: impl Into<String>,
        content_type: &str,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let body = Body::Raw {
            content: content.into(),
            content_type: content_type.to_string(),
        };
        self.send(Method::POST, url, Some(body), options).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Body>,
        options: &RequestOptions,
    ) -> ApiResult<ApiResponse> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let mut request = self.client.request(method.clone(), url).timeout(timeout);

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(token) = &options.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(correlation_id) = &options.correlation_id {
            request = request.header(CORRELATION_HEADER, correlation_id.as_str());
        }
        for (name, value) in &options.headers {
            // An explicit correlation id wins over a raw header of the same name
            if options.correlation_id.is_some() && name.eq_ignore_ascii_case(CORRELATION_HEADER) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        request = match body {
            Some(Body::Json(value)) => request.json(&value),
            Some(Body::Raw { content, content_type }) => {
                request.header(CONTENT_TYPE, content_type).body(content)
            }
            None => request,
        };

        let started = Instant::now();
        let classify = |e: reqwest::Error| classify_error(&method, url, timeout, e);

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(classify)?;
        let data = parse_body(&bytes);

        tracing::debug!(
            "🌐 {} {} -> {} in {:?}",
            method,
            url,
            status,
            started.elapsed()
        );

        if (200..300).contains(&status) {
            Ok(ApiResponse {
                status,
                data,
                headers,
            })
        } else {
            Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: data,
                headers,
            })
        }
    }
}

fn to_json<B: Serialize + ?Sized>(url: &str, body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::Request {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn classify_error(method: &Method, url: &str, timeout: Duration, error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout {
            method: method.to_string(),
            url: url.to_string(),
            after: timeout,
        }
    } else if error.is_builder() {
        ApiError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        ApiError::Connection {
            method: method.to_string(),
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Empty bodies become `Null`, non-JSON bodies are kept as text
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_variants() {
        assert_eq!(parse_body(b""), Value::Null);
        assert_eq!(parse_body(br#"{"ok":true}"#), json!({"ok": true}));
        assert_eq!(parse_body(b"Not Found"), Value::String("Not Found".to_string()));
    }

    #[test]
    fn test_error_accessors() {
        let error = ApiError::Status {
            method: "POST".to_string(),
            url: "http://localhost/api/v1/publish".to_string(),
            status: 400,
            body: json!({"error": "Missing required field: source"}),
            headers: HeaderMap::new(),
        };
        assert_eq!(error.status(), Some(400));
        assert_eq!(error.error_message().as_deref(), Some("Missing required field: source"));
        assert!(!error.is_unreachable());

        let timeout = ApiError::Timeout {
            method: "GET".to_string(),
            url: "http://localhost/health".to_string(),
            after: Duration::from_millis(50),
        };
        assert_eq!(timeout.status(), None);
        assert!(timeout.is_timeout());
        assert!(timeout.is_unreachable());
    }

    #[test]
    fn test_request_options_builder() {
        let session = AuthSession::new("tok", "u1");
        let options = RequestOptions::authenticated(&session)
            .header("X-API-Key", "k")
            .correlation_id("corr-1")
            .query("limit", 5)
            .timeout(Duration::from_secs(3));

        assert_eq!(options.token.as_deref(), Some("tok"));
        assert_eq!(options.headers, vec![("X-API-Key".to_string(), "k".to_string())]);
        assert_eq!(options.correlation_id, Some(CorrelationId::from("corr-1")));
        assert_eq!(options.query, vec![("limit".to_string(), "5".to_string())]);
        assert_eq!(options.timeout, Some(Duration::from_secs(3)));
    }
}
