//! Smoke Suites
//!
//! Fast critical-path checks that run first and abort the run on failure.

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::json;

use super::check_health;
use crate::error::HarnessResult;
use crate::fixtures::{UserFixture, generate_user};
use crate::runner::SuiteRun;
use crate::runtime::{CleanupTask, RequestOptions};
use crate::testing::assertions::{ensure, expect_eq, expect_field, expect_rejected, status};
use crate::testing::json::id_of;

/// Services whose health the smoke tier checks
pub const HEALTH_CHECKED_SERVICES: &[&str] = &[
    "auth",
    "user",
    "product",
    "inventory",
    "cart",
    "order",
    "review",
    "admin",
    "message-broker",
];

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Every critical service reports healthy, and all of them answer within 3s
pub async fn health_checks(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();
    let services = HEALTH_CHECKED_SERVICES
        .iter()
        .map(|key| ctx.service(key).cloned())
        .collect::<HarnessResult<Vec<_>>>()?;

    for service in &services {
        run.case(&format!("{} should be healthy", service.name), async {
            check_health(ctx, service, None, HEALTH_TIMEOUT).await.map(|_| ())
        })
        .await;
    }

    run.case("all critical services respond within 3 seconds", async {
        let started = Instant::now();
        let results = join_all(services.iter().map(|s| check_health(ctx, s, None, HEALTH_TIMEOUT))).await;
        let elapsed = started.elapsed();

        let unhealthy: Vec<&str> = services
            .iter()
            .zip(&results)
            .filter(|(_, result)| result.is_err())
            .map(|(service, _)| service.name.as_str())
            .collect();
        ensure(unhealthy.is_empty(), format!("unhealthy services: {}", unhealthy.join(", ")))?;
        ensure(elapsed < HEALTH_TIMEOUT, format!("health checks took {elapsed:?}"))
    })
    .await;

    Ok(())
}

/// Critical endpoints are routed: validation errors, never 404 or 500
pub async fn critical_apis(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();
    let client = &ctx.client;
    let auth = ctx.service("auth")?;
    let users = ctx.service("user")?;
    let broker = ctx.service("message-broker")?;
    let empty = json!({});

    for service in [auth, users, broker] {
        run.case(&format!("{} /health responds", service.name), async {
            check_health(ctx, service, None, HEALTH_TIMEOUT).await.map(|_| ())
        })
        .await;
    }

    run.case("/api/auth/register is routed", async {
        let result = client.post(&auth.endpoint("/api/auth/register"), &empty, &RequestOptions::new()).await;
        expect_rejected(result, status::VALIDATION).map(|_| ())
    })
    .await;

    run.case("/api/auth/login is routed", async {
        let result = client.post(&auth.endpoint("/api/auth/login"), &empty, &RequestOptions::new()).await;
        expect_rejected(result, &[400, 401, 422]).map(|_| ())
    })
    .await;

    run.case("/api/users is routed", async {
        let result = client.get(&users.endpoint("/api/users/test"), &RequestOptions::new()).await;
        expect_rejected(result, &[401, 403, 404]).map(|_| ())
    })
    .await;

    run.case("/api/v1/publish is routed", async {
        let result = client.post(&broker.endpoint("/api/v1/publish"), &empty, &RequestOptions::new()).await;
        expect_rejected(result, &[400, 401]).map(|_| ())
    })
    .await;

    Ok(())
}

/// A user can register and bad input is rejected
pub async fn auth_flow(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let ctx = run.ctx();

    run.case("register a user", async {
        let payload = generate_user(None);
        let response = ctx.auth.register_raw(&payload).await?;
        expect_eq(response.status, 201, "registration status")?;

        let user = expect_field(&response.data, "/user")?;
        expect_eq(user.get("email"), payload.get("email"), "registered email")?;
        if let Some(user_id) = id_of(user) {
            run.cleanup(CleanupTask::DeleteUser { user_id, token: None });
        }
        Ok(())
    })
    .await;

    run.case("reject invalid registration", async {
        let result = ctx.auth.register_raw(&UserFixture::invalid()).await;
        expect_rejected(result, status::VALIDATION).map(|_| ())
    })
    .await;

    Ok(())
}
