//! Teardown Registry
//!
//! Suites register the platform resources they create (users, carts,
//! reviews) and the registry removes them once the suite is done. Teardown
//! is best-effort: every task is attempted, failures are logged and counted
//! but never turned into suite failures.

use std::sync::Mutex;

use shared::HarnessConfig;
use tracing::{debug, info, warn};

use super::api_client::{ApiClient, ApiResult, RequestOptions};

/// A platform resource to remove after a suite
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupTask {
    DeleteUser { user_id: String, token: Option<String> },
    ClearGuestCart { guest_id: String },
    ClearCart { token: String },
    DeleteReview { review_id: String, token: Option<String> },
    ClearMailbox,
}

impl CleanupTask {
    pub fn describe(&self) -> String {
        match self {
            CleanupTask::DeleteUser { user_id, .. } => format!("delete user {user_id}"),
            CleanupTask::ClearGuestCart { guest_id } => format!("clear guest cart {guest_id}"),
            CleanupTask::ClearCart { .. } => "clear authenticated cart".to_string(),
            CleanupTask::DeleteReview { review_id, .. } => format!("delete review {review_id}"),
            CleanupTask::ClearMailbox => "clear mailpit inbox".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub attempted: usize,
    pub failed: usize,
}

pub struct CleanupManager {
    client: ApiClient,
    config: HarnessConfig,
    tasks: Mutex<Vec<CleanupTask>>,
}

impl CleanupManager {
    pub fn new(client: ApiClient, config: HarnessConfig) -> Self {
        Self {
            client,
            config,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, task: CleanupTask) {
        debug!("🧹 Registered teardown: {}", task.describe());
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).push(task);
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run and drain every registered task, most recent first
    pub async fn run(&self, suite: &str) -> CleanupSummary {
        let tasks: Vec<CleanupTask> = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).rev().collect()
        };

        if tasks.is_empty() {
            return CleanupSummary::default();
        }

        info!("🧹 Tearing down {} resource(s) for suite: {}", tasks.len(), suite);

        let mut summary = CleanupSummary::default();
        for task in tasks {
            summary.attempted += 1;
            match self.execute(&task).await {
                Ok(()) => debug!("✅ Teardown done: {}", task.describe()),
                Err(e) => {
                    summary.failed += 1;
                    warn!("⚠️ Teardown failed ({}): {}", task.describe(), e);
                }
            }
        }

        if summary.failed > 0 {
            warn!(
                "⚠️ Teardown for {} finished with {}/{} failure(s)",
                suite, summary.failed, summary.attempted
            );
        } else {
            info!("✅ Teardown completed for suite: {}", suite);
        }
        summary
    }

    async fn execute(&self, task: &CleanupTask) -> ApiResult<()> {
        match task {
            CleanupTask::DeleteUser { user_id, token } => {
                let url = self.service_url("user", &format!("/api/users/{user_id}"));
                self.client.delete(&url, &with_token(token.as_deref())).await?;
            }
            CleanupTask::ClearGuestCart { guest_id } => {
                let url = format!("{}/api/cart/guest/{guest_id}", self.config.bff_url);
                self.client.delete(&url, &RequestOptions::new()).await?;
            }
            CleanupTask::ClearCart { token } => {
                let url = format!("{}/api/cart", self.config.bff_url);
                self.client.delete(&url, &RequestOptions::new().token(token.clone())).await?;
            }
            CleanupTask::DeleteReview { review_id, token } => {
                let url = self.service_url("review", &format!("/api/reviews/{review_id}"));
                self.client.delete(&url, &with_token(token.as_deref())).await?;
            }
            CleanupTask::ClearMailbox => {
                let url = format!("{}/messages", self.config.mailpit_api_url.trim_end_matches('/'));
                self.client.delete(&url, &RequestOptions::new()).await?;
            }
        }
        Ok(())
    }

    fn service_url(&self, key: &str, path: &str) -> String {
        match self.config.service(key) {
            Ok(service) => service.endpoint(path),
            Err(_) => path.to_string(),
        }
    }
}

fn with_token(token: Option<&str>) -> RequestOptions {
    match token {
        Some(token) => RequestOptions::new().token(token),
        None => RequestOptions::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager() -> CleanupManager {
        let config = HarnessConfig::builder()
            .service_url("user", "http://127.0.0.1:9")
            .bff_url("http://127.0.0.1:9")
            .build();
        let client = ApiClient::new(Duration::from_millis(200)).unwrap();
        CleanupManager::new(client, config)
    }

    #[test]
    fn test_register_counts_pending() {
        let cleanup = manager();
        cleanup.register(CleanupTask::ClearGuestCart { guest_id: "g-1".into() });
        cleanup.register(CleanupTask::DeleteUser { user_id: "u-1".into(), token: None });
        assert_eq!(cleanup.pending(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let cleanup = manager();
        cleanup.register(CleanupTask::DeleteUser { user_id: "u-1".into(), token: None });
        cleanup.register(CleanupTask::ClearGuestCart { guest_id: "g-1".into() });

        let summary = cleanup.run("unit").await;
        assert_eq!(summary, CleanupSummary { attempted: 2, failed: 2 });
        assert_eq!(cleanup.pending(), 0);
    }

    #[tokio::test]
    async fn test_empty_registry_is_noop() {
        assert_eq!(manager().run("unit").await, CleanupSummary::default());
    }
}
