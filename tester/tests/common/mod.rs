//! Common test utilities and infrastructure
//!
//! In-process mock platform services bound to ephemeral ports, plus harness
//! configurations pointing at them.

#![allow(dead_code)]

pub mod mocks;

use std::time::Duration;

use axum::Router;
use shared::{HarnessConfig, SERVICE_CATALOG};
use tokio::net::TcpListener;

pub use mocks::{BROKER_API_KEY, MockPlatform, health_router, platform_router};

/// Address nothing listens on
pub const DEAD_URL: &str = "http://127.0.0.1:9";

/// Serve `router` on 127.0.0.1:0 and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{addr}")
}

/// Every catalogued service, the BFF and Mailpit pointed at `base_url`
pub fn config_for(base_url: &str) -> HarnessConfig {
    let builder = SERVICE_CATALOG
        .iter()
        .fold(HarnessConfig::builder(), |builder, entry| builder.service_url(entry.key, base_url));

    builder
        .bff_url(base_url)
        .mailpit_api_url(format!("{base_url}/api/v1"))
        .message_broker_api_key(BROKER_API_KEY)
        .max_retries(3)
        .retry_interval(Duration::from_millis(20))
        .attempt_timeout(Duration::from_millis(500))
        .request_timeout(Duration::from_secs(5))
        .build()
}

/// Spawn the full mock platform; returns its base URL and account state
pub async fn spawn_platform(requires_verification: bool) -> (String, std::sync::Arc<MockPlatform>) {
    let platform = MockPlatform::new(requires_verification);
    let base_url = spawn(platform_router(platform.clone())).await;
    (base_url, platform)
}
