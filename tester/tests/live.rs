//! Suites against a running platform
//!
//! Ignored by default; run with `cargo test -p tester --test live -- --ignored`
//! once the services from `.env` (or the localhost defaults) are up.

use shared::HarnessConfig;
use tester::{HarnessContext, RunOptions, Tier, run_all, run_suite};

fn live_context() -> HarnessContext {
    let config = HarnessConfig::from_env().expect("harness configuration");
    shared::logging::init_tracing(config.verbose, None);
    HarnessContext::new(config).expect("harness context")
}

async fn assert_tier_passes(tier: Tier) {
    let ctx = live_context();
    let options = RunOptions {
        tier: Some(tier),
        ..RunOptions::default()
    };
    let summary = run_all(&ctx, &options).await.expect("run");
    assert!(summary.success(), "{}", summary.render());
}

#[tokio::test]
#[ignore]
async fn test_live_smoke_tier() {
    assert_tier_passes(Tier::Smoke).await;
}

#[tokio::test]
#[ignore]
async fn test_live_api_tier() {
    assert_tier_passes(Tier::Api).await;
}

#[tokio::test]
#[ignore]
async fn test_live_integration_tier() {
    assert_tier_passes(Tier::Integration).await;
}

#[tokio::test]
#[ignore]
async fn test_live_e2e_tier() {
    assert_tier_passes(Tier::E2e).await;
}

#[tokio::test]
#[ignore]
async fn test_live_auth_load() {
    let ctx = live_context();
    let report = run_suite(&ctx, "performance/auth-load", None).await;
    assert!(report.success(), "failures: {:?}", report.failures);
}
