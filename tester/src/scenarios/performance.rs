//! Performance Suites
//!
//! Registration throughput under a concurrent burst and under sustained load.
//! Every request carries its own fixture; successful registrations are
//! scheduled for deletion.

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::sleep;

use crate::error::HarnessResult;
use crate::fixtures::generate_user;
use crate::runner::SuiteRun;
use crate::runtime::CleanupTask;
use crate::testing::assertions::ensure;

const BURST_SUCCESS_RATE: f64 = 0.9;
const BURST_MAX_AVERAGE: Duration = Duration::from_secs(5);
const BURST_MAX_SINGLE: Duration = Duration::from_secs(10);
const SUSTAINED_SUCCESS_RATE: f64 = 0.8;
const SUSTAINED_MAX_AVERAGE: Duration = Duration::from_secs(2);
const SUSTAINED_PAUSE: Duration = Duration::from_millis(100);

/// One timed request
#[derive(Debug, Clone, Copy)]
struct Sample {
    success: bool,
    duration: Duration,
}

/// Aggregated latency and success figures for a batch of samples
#[derive(Debug, Clone, PartialEq)]
pub struct LoadStats {
    pub requests: usize,
    pub successful: usize,
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
    pub elapsed: Duration,
}

impl LoadStats {
    fn from_samples(samples: &[Sample], elapsed: Duration) -> Self {
        let durations = samples.iter().map(|s| s.duration);
        let total: Duration = durations.clone().sum();
        let average = if samples.is_empty() {
            Duration::ZERO
        } else {
            total / samples.len() as u32
        };
        Self {
            requests: samples.len(),
            successful: samples.iter().filter(|s| s.success).count(),
            average,
            min: durations.clone().min().unwrap_or_default(),
            max: durations.max().unwrap_or_default(),
            elapsed,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.successful as f64 / self.requests as f64
        }
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.requests as f64 / secs } else { 0.0 }
    }

    pub fn render(&self) -> String {
        format!(
            "{} requests, {} ok ({:.1}%), avg {:?}, min {:?}, max {:?}, {:.2} req/s",
            self.requests,
            self.successful,
            self.success_rate() * 100.0,
            self.average,
            self.min,
            self.max,
            self.throughput()
        )
    }
}

/// Register one fresh user, timing the call
async fn timed_registration(run: &SuiteRun<'_>) -> Sample {
    let started = Instant::now();
    let result = run.ctx().auth.register(&generate_user(None)).await;
    let duration = started.elapsed();
    match result {
        Ok(registration) => {
            run.cleanup(CleanupTask::DeleteUser { user_id: registration.user_id, token: None });
            Sample { success: true, duration }
        }
        Err(e) => {
            tracing::debug!("registration under load failed: {}", e);
            Sample { success: false, duration }
        }
    }
}

pub async fn auth_load(run: &SuiteRun<'_>) -> HarnessResult<()> {
    let perf = &run.ctx().config.perf;

    run.case(&format!("{} concurrent registrations", perf.concurrent_users), async {
        let started = Instant::now();
        let samples = join_all((0..perf.concurrent_users).map(|_| timed_registration(run))).await;
        let stats = LoadStats::from_samples(&samples, started.elapsed());
        tracing::info!("📊 Burst: {}", stats.render());

        ensure(
            stats.success_rate() > BURST_SUCCESS_RATE,
            format!("success rate {:.1}% not above 90%", stats.success_rate() * 100.0),
        )?;
        ensure(stats.average < BURST_MAX_AVERAGE, format!("average response {:?}", stats.average))?;
        ensure(stats.max < BURST_MAX_SINGLE, format!("slowest response {:?}", stats.max))
    })
    .await;

    run.case(&format!("sustained load for {:?}", perf.duration), async {
        let started = Instant::now();
        let mut samples = Vec::new();
        while started.elapsed() < perf.duration {
            samples.push(timed_registration(run).await);
            sleep(SUSTAINED_PAUSE).await;
        }
        let stats = LoadStats::from_samples(&samples, started.elapsed());
        tracing::info!("📊 Sustained: {}", stats.render());

        ensure(
            stats.success_rate() > SUSTAINED_SUCCESS_RATE,
            format!("success rate {:.1}% not above 80%", stats.success_rate() * 100.0),
        )?;
        ensure(stats.average < SUSTAINED_MAX_AVERAGE, format!("average response {:?}", stats.average))
    })
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(success: bool, millis: u64) -> Sample {
        Sample {
            success,
            duration: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_stats_from_samples() {
        let samples = [sample(true, 100), sample(true, 300), sample(false, 200), sample(true, 400)];
        let stats = LoadStats::from_samples(&samples, Duration::from_secs(2));

        assert_eq!(stats.requests, 4);
        assert_eq!(stats.successful, 3);
        assert_eq!(stats.average, Duration::from_millis(250));
        assert_eq!(stats.min, Duration::from_millis(100));
        assert_eq!(stats.max, Duration::from_millis(400));
        assert!((stats.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!((stats.throughput() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_stats() {
        let stats = LoadStats::from_samples(&[], Duration::ZERO);
        assert_eq!(stats.average, Duration::ZERO);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.throughput(), 0.0);
    }
}
