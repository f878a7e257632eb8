//! Readiness gate against live sockets: healthy, flapping, unhealthy and dead services

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use shared::{ProbeOutcome, ServiceDescriptor};
use tester::{ApiClient, HarnessError, ReadinessProber};

use common::{DEAD_URL, config_for, health_router, spawn};

const INTERVAL: Duration = Duration::from_millis(50);

fn prober(max_retries: u32) -> ReadinessProber {
    let settings = shared::ReadinessSettings {
        max_retries,
        interval: INTERVAL,
        attempt_timeout: Duration::from_millis(500),
    };
    ReadinessProber::new(ApiClient::new(Duration::from_secs(2)).unwrap(), &settings)
}

/// Answers 503 until the `healthy_from`-th request
async fn spawn_flapping(healthy_from: u32) -> (String, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let router = Router::new()
        .route(
            "/health",
            get(move |State(hits): State<Arc<AtomicU32>>| async move {
                let hit = hits.fetch_add(1, Ordering::SeqCst) + 1;
                if hit >= healthy_from {
                    (StatusCode::OK, Json(json!({ "status": "healthy" })))
                } else {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "starting" })))
                }
            }),
        )
        .with_state(hits.clone());
    (spawn(router).await, hits)
}

#[tokio::test]
async fn test_healthy_service_is_ready_on_first_attempt() {
    let base_url = spawn(health_router(StatusCode::OK, "healthy")).await;
    let service = ServiceDescriptor::new("Auth Service", base_url, "/health");

    let result = prober(5).probe_service(&service).await;
    assert!(result.ready);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.outcome, ProbeOutcome::Healthy);
}

#[tokio::test]
async fn test_probing_stops_at_first_healthy_attempt() {
    let (base_url, hits) = spawn_flapping(3).await;
    let service = ServiceDescriptor::new("User Service", base_url, "/health");

    let result = prober(10).probe_service(&service).await;
    assert!(result.ready);
    assert_eq!(result.attempts, 3);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(result.elapsed >= INTERVAL * 2);
}

#[tokio::test]
async fn test_dead_service_uses_every_attempt() {
    let service = ServiceDescriptor::new("Message Broker", DEAD_URL, "/health");

    let result = prober(4).probe_service(&service).await;
    assert!(!result.ready);
    assert_eq!(result.attempts, 4);
    assert!(result.elapsed >= INTERVAL * 3);
    assert_matches!(result.outcome, ProbeOutcome::NeverResponded { .. });
}

#[tokio::test]
async fn test_hanging_service_is_bounded_by_attempt_timeout() {
    let hanging = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({ "status": "healthy" }))
        }),
    );
    let base_url = spawn(hanging).await;
    let service = ServiceDescriptor::new("Audit Service", base_url, "/health");

    let attempt_timeout = Duration::from_millis(100);
    let settings = shared::ReadinessSettings {
        max_retries: 3,
        interval: INTERVAL,
        attempt_timeout,
    };
    let prober = ReadinessProber::new(ApiClient::new(Duration::from_secs(60)).unwrap(), &settings);

    let result = prober.probe_service(&service).await;
    assert!(!result.ready);
    assert_eq!(result.attempts, 3);
    assert_matches!(result.outcome, ProbeOutcome::NeverResponded { .. });
    assert!(result.elapsed >= attempt_timeout * 3 + INTERVAL * 2);
    // Three timed-out attempts plus the pauses between them, with scheduling slack
    assert!(result.elapsed < (attempt_timeout + INTERVAL) * 3 + Duration::from_secs(1));
}

#[tokio::test]
async fn test_ok_without_healthy_marker_is_unhealthy() {
    let base_url = spawn(health_router(StatusCode::OK, "degraded")).await;
    let service = ServiceDescriptor::new("Cart Service", base_url, "/health");

    let result = prober(2).probe_service(&service).await;
    assert!(!result.ready);
    assert_matches!(result.outcome, ProbeOutcome::Unhealthy { status: 200, .. });
}

#[tokio::test]
async fn test_report_names_every_unready_service() {
    let healthy = spawn(health_router(StatusCode::OK, "healthy")).await;
    let failing = spawn(health_router(StatusCode::SERVICE_UNAVAILABLE, "unhealthy")).await;
    let services = [
        ServiceDescriptor::new("Auth Service", healthy, "/health"),
        ServiceDescriptor::new("User Service", failing, "/health"),
        ServiceDescriptor::new("Message Broker", DEAD_URL, "/health"),
    ];

    let report = prober(2).wait_for_services(&services).await;
    assert!(!report.all_ready());
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.unready_names(), vec!["User Service".to_string(), "Message Broker".to_string()]);

    let rendered = report.render();
    assert!(rendered.contains("✓ Auth Service is ready"));
    assert!(rendered.contains("User Service (responded unhealthy"));
    assert!(rendered.contains("Message Broker (never responded"));

    assert_matches!(
        report.into_result(),
        Err(HarnessError::NotReady { services }) if services.len() == 2
    );
}

#[tokio::test]
async fn test_prober_from_config_gates_on_configured_services() {
    let base_url = spawn(health_router(StatusCode::OK, "healthy")).await;
    let config = config_for(&base_url);

    let prober = ReadinessProber::from_config(&config).unwrap();
    let report = prober.wait_for_services(&config.readiness_descriptors()).await;
    assert!(report.all_ready());
    assert_eq!(report.results.len(), config.readiness_services.len());
}
