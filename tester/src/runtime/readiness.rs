//! Service Readiness Prober
//!
//! Polls the health endpoint of every dependent service before a run starts.
//! Services are probed concurrently; each service's own attempts are
//! sequential and bounded by the retry policy, so the worst case wait is
//! `max_retries * interval` plus one attempt timeout. Every service is
//! evaluated even after another one fails, so a single report lists all of
//! the unready services.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use shared::{HarnessConfig, HealthReport, ProbeOutcome, ProbeResult, ReadinessSettings, ServiceDescriptor};

use super::api_client::{ApiClient, ApiError, RequestOptions};
use super::retry::{RetryPolicy, retry};
use crate::error::{HarnessError, HarnessResult};

pub struct ReadinessProber {
    client: ApiClient,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl ReadinessProber {
    pub fn new(client: ApiClient, settings: &ReadinessSettings) -> Self {
        Self {
            client,
            policy: RetryPolicy::from_readiness(settings),
            attempt_timeout: settings.attempt_timeout,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> HarnessResult<Self> {
        let client = ApiClient::new(config.readiness.attempt_timeout)?;
        Ok(Self::new(client, &config.readiness))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One health check: 200 with a healthy marker, or why not
    pub async fn probe_once(&self, service: &ServiceDescriptor) -> Result<(), ProbeOutcome> {
        let options = RequestOptions::new().timeout(self.attempt_timeout);

        match self.client.get(&service.health_url(), &options).await {
            Ok(response) => match response.json::<HealthReport>() {
                Ok(report) if response.status == 200 && report.is_healthy() => Ok(()),
                Ok(report) => Err(ProbeOutcome::Unhealthy {
                    status: response.status,
                    detail: format!("status '{}'", report.status),
                }),
                Err(_) => Err(ProbeOutcome::Unhealthy {
                    status: response.status,
                    detail: format!("unexpected health body: {}", response.data),
                }),
            },
            Err(ApiError::Status { status, body, .. }) => Err(ProbeOutcome::Unhealthy {
                status,
                detail: body.to_string(),
            }),
            Err(other) => Err(ProbeOutcome::NeverResponded {
                last_error: other.to_string(),
            }),
        }
    }

    /// Probe one service until healthy or out of attempts
    pub async fn probe_service(&self, service: &ServiceDescriptor) -> ProbeResult {
        let max_attempts = self.policy.max_attempts;

        let outcome = retry(&self.policy, |attempt| async move {
            let result = self.probe_once(service).await;
            if let Err(reason) = &result {
                tracing::info!(
                    "⏳ Waiting for {}... (attempt {}/{}): {}",
                    service.name,
                    attempt,
                    max_attempts,
                    reason
                );
            }
            result
        })
        .await;

        match outcome.result {
            Ok(()) => {
                tracing::info!("✓ {} is ready", service.name);
                ProbeResult {
                    service: service.clone(),
                    ready: true,
                    attempts: outcome.attempts,
                    outcome: ProbeOutcome::Healthy,
                    elapsed: outcome.elapsed,
                }
            }
            Err(reason) => {
                tracing::error!(
                    "✗ {} failed to become ready after {} attempts",
                    service.name,
                    outcome.attempts
                );
                ProbeResult {
                    service: service.clone(),
                    ready: false,
                    attempts: outcome.attempts,
                    outcome: reason,
                    elapsed: outcome.elapsed,
                }
            }
        }
    }

    /// Probe every descriptor concurrently and collect one report
    pub async fn wait_for_services(&self, descriptors: &[ServiceDescriptor]) -> ReadinessReport {
        tracing::info!("🚀 Waiting for {} service(s) to be ready", descriptors.len());
        let started = Instant::now();

        let results = join_all(descriptors.iter().map(|service| self.probe_service(service))).await;

        let report = ReadinessReport {
            results,
            elapsed: started.elapsed(),
        };
        if report.all_ready() {
            tracing::info!("✅ All services are ready ({:?})", report.elapsed);
        } else {
            tracing::error!("❌ Some services failed to start: {}", report.unready_names().join(", "));
        }
        report
    }
}

/// Gating decision for one run
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub results: Vec<ProbeResult>,
    pub elapsed: Duration,
}

impl ReadinessReport {
    pub fn all_ready(&self) -> bool {
        self.results.iter().all(|result| result.ready)
    }

    pub fn unready(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|result| !result.ready)
    }

    pub fn unready_names(&self) -> Vec<String> {
        self.unready().map(|result| result.service.name.clone()).collect()
    }

    /// Per-service status report, one line each, unready services enumerated last
    pub fn render(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let attempts = match result.attempts {
                1 => "1 attempt".to_string(),
                n => format!("{n} attempts"),
            };
            if result.ready {
                let _ = writeln!(out, "✓ {} is ready ({})", result.service.name, attempts);
            } else {
                let _ = writeln!(
                    out,
                    "✗ {} not ready after {}: {}",
                    result.service.name, attempts, result.outcome
                );
            }
        }

        if self.all_ready() {
            let _ = writeln!(out, "\n✅ All services are ready!");
        } else {
            let _ = writeln!(out, "\n❌ Some services failed to start:");
            for result in self.unready() {
                let kind = match result.outcome {
                    ProbeOutcome::NeverResponded { .. } => "never responded",
                    _ => "responded unhealthy",
                };
                let _ = writeln!(out, "  - {} ({}, {})", result.service.name, kind, result.service.health_url());
            }
        }
        out
    }

    /// Turn a failed gate into an error naming every unready service
    pub fn into_result(self) -> HarnessResult<Self> {
        if self.all_ready() {
            Ok(self)
        } else {
            Err(HarnessError::NotReady {
                services: self.unready_names(),
            })
        }
    }
}
