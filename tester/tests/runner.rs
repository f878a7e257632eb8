//! Suite runner: readiness gating, tier ordering, fail-fast and global teardown

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shared::HarnessConfigBuilder;
use tester::{HarnessContext, HarnessError, RunOptions, Tier, run_all};

use common::{DEAD_URL, config_for, health_router, spawn, spawn_platform};

fn suites(names: &[&str]) -> RunOptions {
    RunOptions {
        suites: names.iter().map(|n| n.to_string()).collect(),
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_gated_run_executes_suites_in_tier_order() {
    let (base_url, _) = spawn_platform(false).await;
    let ctx = HarnessContext::new(config_for(&base_url)).unwrap();

    let summary = run_all(&ctx, &suites(&["api/message-broker", "smoke/health-checks"])).await.unwrap();

    assert!(summary.success(), "{}", summary.render());
    let readiness = summary.readiness.as_ref().unwrap();
    assert!(readiness.all_ready());
    let order: Vec<&str> = summary.suites.iter().map(|r| r.suite.as_str()).collect();
    assert_eq!(order, vec!["smoke/health-checks", "api/message-broker"]);
    assert_eq!(summary.totals().1, 0);
}

#[tokio::test]
async fn test_unready_services_abort_before_any_suite() {
    let ctx = HarnessContext::new(config_for(DEAD_URL)).unwrap();

    let error = run_all(&ctx, &suites(&["smoke/health-checks"])).await.unwrap_err();
    assert_matches!(error, HarnessError::NotReady { services } => {
        assert_eq!(services, vec!["Auth Service", "User Service", "Message Broker"]);
    });
}

#[tokio::test]
async fn test_failed_smoke_tier_stops_later_tiers() {
    let base_url = spawn(health_router(StatusCode::SERVICE_UNAVAILABLE, "unhealthy")).await;
    let ctx = HarnessContext::new(config_for(&base_url)).unwrap();

    let options = RunOptions {
        skip_readiness: true,
        ..suites(&["smoke/health-checks", "api/message-broker"])
    };
    let summary = run_all(&ctx, &options).await.unwrap();

    assert!(summary.readiness.is_none());
    assert!(!summary.success());
    assert_eq!(summary.suites.len(), 1);
    assert_eq!(summary.suites[0].tier, Tier::Smoke);
    assert!(summary.suites[0].failed > 0);
    assert_eq!(summary.not_run, vec!["api/message-broker".to_string()]);
    assert!(summary.render().contains("api/message-broker: not run"));
}

#[tokio::test]
async fn test_tier_filter_limits_selection() {
    let (base_url, _) = spawn_platform(false).await;
    let ctx = HarnessContext::new(config_for(&base_url)).unwrap();

    let options = RunOptions {
        tier: Some(Tier::Smoke),
        skip_readiness: true,
        ..suites(&["smoke/health-checks", "api/message-broker"])
    };
    let summary = run_all(&ctx, &options).await.unwrap();

    assert_eq!(summary.suites.len(), 1);
    assert_eq!(summary.suites[0].suite, "smoke/health-checks");
    assert!(summary.not_run.is_empty());
}

#[tokio::test]
async fn test_case_timeout_fails_slow_cases() {
    let slow_health = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({ "status": "healthy" }))
        }),
    );
    let base_url = spawn(slow_health).await;
    let ctx = HarnessContext::new(config_for(&base_url)).unwrap();

    let options = RunOptions {
        skip_readiness: true,
        case_timeout: Some(Duration::from_millis(50)),
        ..suites(&["smoke/health-checks"])
    };
    let summary = run_all(&ctx, &options).await.unwrap();

    let report = &summary.suites[0];
    assert_eq!(report.passed, 0);
    assert!(report.failed > 0);
    assert!(report.failures.iter().all(|f| f.contains("did not complete within")));
}

#[tokio::test]
async fn test_cleanup_after_tests_clears_the_mailbox() {
    let (base_url, platform) = spawn_platform(false).await;
    let config = HarnessConfigBuilder::from_config(config_for(&base_url))
        .cleanup_after_tests(true)
        .build();
    let ctx = HarnessContext::new(config).unwrap();

    let options = RunOptions {
        skip_readiness: true,
        ..suites(&["smoke/critical-apis"])
    };
    run_all(&ctx, &options).await.unwrap();
    assert_eq!(platform.mailbox_clears(), 1);
}

#[tokio::test]
async fn test_unknown_suite_is_rejected() {
    let ctx = HarnessContext::new(config_for(DEAD_URL)).unwrap();
    let error = run_all(&ctx, &suites(&["smoke/does-not-exist"])).await.unwrap_err();
    assert_matches!(error, HarnessError::UnknownSuite { name, .. } if name == "smoke/does-not-exist");
}
