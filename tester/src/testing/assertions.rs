//! Response Assertion Framework
//!
//! Assertions over platform responses. Expected failures are always checked
//! against a set of acceptable status codes, because services legitimately
//! differ on e.g. 400 vs 422 for validation or 409 vs 429 for duplicates.

use std::fmt::Debug;

use serde_json::Value;
use shared::CorrelationId;

use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{ApiError, ApiResponse, ApiResult};

/// Acceptable status sets for expected outcomes
pub mod status {
    pub const OK: &[u16] = &[200];
    pub const CREATED: &[u16] = &[201];
    pub const OK_OR_NO_CONTENT: &[u16] = &[200, 204];
    pub const VALIDATION: &[u16] = &[400, 422];
    pub const BAD_REQUEST: &[u16] = &[400];
    pub const UNAUTHORIZED: &[u16] = &[401];
    pub const FORBIDDEN_OR_UNAUTHORIZED: &[u16] = &[401, 403];
    pub const NOT_FOUND: &[u16] = &[404];
    pub const DUPLICATE: &[u16] = &[400, 409, 429];
    pub const TOO_LARGE: &[u16] = &[400, 413];
}

#[derive(Debug, Clone)]
pub struct AssertionResult {
    pub success: bool,
    pub message: String,
    pub details: Option<String>,
}

impl AssertionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn failure(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn into_result(self) -> HarnessResult<()> {
        if self.success {
            Ok(())
        } else {
            let details = self.details.as_deref().unwrap_or("No additional details");
            Err(HarnessError::assertion(format!("{} - {}", self.message, details)))
        }
    }
}

/// The response status is one of `expected`
pub fn expect_status(response: &ApiResponse, expected: &[u16]) -> AssertionResult {
    if expected.contains(&response.status) {
        AssertionResult::success(format!("HTTP {} is one of {:?}", response.status, expected))
    } else {
        AssertionResult::failure(
            format!("Expected HTTP {:?}, got {}", expected, response.status),
            Some(response.data.to_string()),
        )
    }
}

/// The call failed with an upstream status in `expected`; returns that status
pub fn expect_rejected(result: ApiResult<ApiResponse>, expected: &[u16]) -> HarnessResult<u16> {
    match result {
        Ok(response) => Err(HarnessError::assertion(format!(
            "Expected rejection with {:?}, but got HTTP {}: {}",
            expected, response.status, response.data
        ))),
        Err(ApiError::Status { status, .. }) if expected.contains(&status) => Ok(status),
        Err(ApiError::Status { status, body, url, .. }) => Err(HarnessError::assertion(format!(
            "Expected rejection with {expected:?} from {url}, got HTTP {status}: {body}"
        ))),
        Err(other) => Err(HarnessError::Api(other)),
    }
}

/// The call succeeded with a status in `ok`, or was rejected with one in `rejected`
pub fn expect_outcome(
    result: ApiResult<ApiResponse>,
    ok: &[u16],
    rejected: &[u16],
) -> HarnessResult<Result<ApiResponse, u16>> {
    match result {
        Ok(response) if ok.contains(&response.status) => Ok(Ok(response)),
        Ok(response) => Err(HarnessError::assertion(format!(
            "Unexpected success status {} (allowed {:?})",
            response.status, ok
        ))),
        Err(ApiError::Status { status, .. }) if rejected.contains(&status) => Ok(Err(status)),
        Err(other) => Err(HarnessError::Api(other)),
    }
}

/// A rejection body carries an `error` naming `needle`
pub fn expect_error_mentions(result: ApiResult<ApiResponse>, expected: &[u16], needle: &str) -> HarnessResult<u16> {
    match result {
        Err(error @ ApiError::Status { .. }) => {
            let message = error.error_message().unwrap_or_default();
            let status = expect_rejected(Err(error), expected)?;
            ensure(
                message.contains(needle),
                format!("error message '{message}' should mention '{needle}'"),
            )?;
            Ok(status)
        }
        other => expect_rejected(other, expected),
    }
}

/// An echoed correlation id, when present, matches what was sent
pub fn expect_correlation_echo(response: &ApiResponse, sent: &CorrelationId) -> AssertionResult {
    match response.correlation_id() {
        None => AssertionResult::success("correlation id not echoed"),
        Some(echoed) if echoed == sent.as_str() => AssertionResult::success(format!("correlation id {sent} echoed")),
        Some(echoed) => AssertionResult::failure(
            "echoed correlation id differs from the one sent",
            Some(format!("sent {sent}, echoed {echoed}")),
        ),
    }
}

pub fn ensure(condition: bool, message: impl Into<String>) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::assertion(message))
    }
}

pub fn expect_eq<T: PartialEq + Debug>(actual: T, expected: T, what: &str) -> HarnessResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "{what}: expected {expected:?}, got {actual:?}"
        )))
    }
}

/// The value at a JSON pointer, failing when absent or null
pub fn expect_field<'a>(body: &'a Value, pointer: &str) -> HarnessResult<&'a Value> {
    match body.pointer(pointer) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(HarnessError::assertion(format!("missing field {pointer} in {body}"))),
    }
}

/// Log an [`AssertionResult`] and return early from the enclosing function on failure
#[macro_export]
macro_rules! check {
    ($assertion_result:expr) => {{
        let result: $crate::testing::AssertionResult = $assertion_result;
        if result.success {
            tracing::info!("✅ {}", result.message);
        } else {
            let details = result.details.as_deref().unwrap_or("No additional details");
            tracing::error!("❌ {} - {}", result.message, details);
        }
        result.into_result()?;
    }};
}
