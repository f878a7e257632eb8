//! Runtime Management
//!
//! HTTP plumbing shared by every suite: the client wrapper, the retry and
//! polling primitives, the readiness prober and the teardown registry.

pub mod api_client;
pub mod cleanup;
pub mod readiness;
pub mod retry;

// Re-export main types
pub use api_client::{ApiClient, ApiError, ApiResponse, ApiResult, RequestOptions};
pub use cleanup::{CleanupManager, CleanupSummary, CleanupTask};
pub use readiness::{ReadinessProber, ReadinessReport};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, poll_until, retry};
