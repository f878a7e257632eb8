//! Workflow Suites
//!
//! Named suites that drive the live platform. A suite's name is its path;
//! the first segment is its tier, so the sequencer orders suites by name.

pub mod api;
pub mod e2e;
pub mod integration;
pub mod performance;
pub mod smoke;

use std::time::Duration;

use serde_json::Value;
use shared::{AuthSession, ServiceDescriptor};

use crate::auth::SessionOutcome;
use crate::error::{HarnessError, HarnessResult};
use crate::runner::{HarnessContext, SuiteRun};
use crate::runtime::{CleanupTask, RequestOptions};
use crate::sequencer::{Tier, tier_for_path};
use crate::testing::assertions::expect_eq;

#[derive(Debug, Clone, Copy)]
pub struct SuiteSpec {
    pub name: &'static str,
    pub description: &'static str,
}

impl SuiteSpec {
    pub fn tier(&self) -> Tier {
        tier_for_path(self.name)
    }
}

pub const SUITES: &[SuiteSpec] = &[
    SuiteSpec { name: "smoke/health-checks", description: "critical services report healthy" },
    SuiteSpec { name: "smoke/critical-apis", description: "critical endpoints are routed" },
    SuiteSpec { name: "smoke/auth-flow", description: "a user can register" },
    SuiteSpec { name: "api/auth-service", description: "auth service registration, login and tokens" },
    SuiteSpec { name: "api/user-service", description: "user service lookup, update and deletion" },
    SuiteSpec { name: "api/message-broker", description: "event publish contract" },
    SuiteSpec { name: "integration/product-service", description: "product listing and retrieval" },
    SuiteSpec { name: "integration/user-registration", description: "registration across auth, user and broker" },
    SuiteSpec { name: "integration/user-login", description: "login rejections" },
    SuiteSpec { name: "integration/add-to-cart", description: "guest and authenticated carts through the BFF" },
    SuiteSpec { name: "integration/order-placement", description: "orders through the BFF" },
    SuiteSpec { name: "e2e/user-registration", description: "registration through welcome e-mail" },
    SuiteSpec { name: "e2e/order-placement", description: "product to order across services" },
    SuiteSpec { name: "e2e/product-review", description: "review events update product aggregates" },
    SuiteSpec { name: "performance/auth-load", description: "registration under concurrent and sustained load" },
];

pub struct TestSuites;

impl TestSuites {
    /// Run a specific suite by name
    pub async fn run_suite(name: &str, run: &SuiteRun<'_>) -> HarnessResult<()> {
        match name {
            // Smoke: fail-fast critical path
            "smoke/health-checks" => smoke::health_checks(run).await,
            "smoke/critical-apis" => smoke::critical_apis(run).await,
            "smoke/auth-flow" => smoke::auth_flow(run).await,

            // Per-service API contracts
            "api/auth-service" => api::auth_service(run).await,
            "api/user-service" => api::user_service(run).await,
            "api/message-broker" => api::message_broker(run).await,

            // Cross-service workflows
            "integration/product-service" => integration::product_service(run).await,
            "integration/user-registration" => integration::user_registration(run).await,
            "integration/user-login" => integration::user_login(run).await,
            "integration/add-to-cart" => integration::add_to_cart(run).await,
            "integration/order-placement" => integration::order_placement(run).await,

            // End-to-end journeys
            "e2e/user-registration" => e2e::user_registration(run).await,
            "e2e/order-placement" => e2e::order_placement(run).await,
            "e2e/product-review" => e2e::product_review(run).await,

            "performance/auth-load" => performance::auth_load(run).await,

            _ => Err(HarnessError::UnknownSuite {
                name: name.to_string(),
                available: Self::available_suites().join(", "),
            }),
        }
    }

    /// Get list of available suites
    pub fn available_suites() -> Vec<&'static str> {
        SUITES.iter().map(|suite| suite.name).collect()
    }

    pub fn find(name: &str) -> Option<&'static SuiteSpec> {
        SUITES.iter().find(|suite| suite.name == name)
    }
}

/// Well-formed ObjectId that no suite ever creates
pub(crate) const ABSENT_OBJECT_ID: &str = "507f1f77bcf86cd799439011";

/// Register a fresh user and log in, scheduling the user's deletion
///
/// Skips the calling case when the platform requires e-mail verification
/// before login.
pub(crate) async fn authenticated_session(run: &SuiteRun<'_>, overrides: Option<Value>) -> HarnessResult<AuthSession> {
    match run.ctx().auth.create_authenticated_user(overrides).await? {
        SessionOutcome::Authenticated(user) => {
            run.cleanup(CleanupTask::DeleteUser {
                user_id: user.session.user_id.clone(),
                token: Some(user.session.token.clone()),
            });
            Ok(user.session)
        }
        SessionOutcome::PendingVerification(registration) => {
            run.cleanup(CleanupTask::DeleteUser { user_id: registration.user_id, token: None });
            Err(HarnessError::skipped("login requires e-mail verification"))
        }
    }
}

/// Record every case that depends on a missing prerequisite as skipped
pub(crate) fn skip_all(run: &SuiteRun<'_>, cases: &[&str], reason: &str) {
    for case in cases {
        run.skip(case, reason);
    }
}

/// GET the service's health endpoint and require a healthy body
///
/// With `expected_service`, the body's `service` field must match too.
pub(crate) async fn check_health(
    ctx: &HarnessContext,
    service: &ServiceDescriptor,
    expected_service: Option<&str>,
    timeout: Duration,
) -> HarnessResult<Value> {
    let response = ctx
        .client
        .get(&service.health_url(), &RequestOptions::new().timeout(timeout))
        .await?;
    expect_eq(response.status, 200, &format!("{} health HTTP status", service.name))?;
    expect_eq(
        response.data.get("status").and_then(Value::as_str),
        Some(shared::HEALTHY_MARKER),
        &format!("{} health status", service.name),
    )?;
    if let Some(expected) = expected_service {
        expect_eq(
            response.data.get("service").and_then(Value::as_str),
            Some(expected),
            &format!("{} health service name", service.name),
        )?;
    }
    Ok(response.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_suite_has_a_known_tier() {
        for suite in SUITES {
            assert_ne!(suite.tier(), Tier::Other, "{} has no tier segment", suite.name);
        }
    }

    #[test]
    fn test_suite_names_unique() {
        let names: HashSet<&str> = SUITES.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), SUITES.len());
        assert!(TestSuites::find("api/message-broker").is_some());
        assert!(TestSuites::find("api/nope").is_none());
    }
}
