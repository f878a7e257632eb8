//! Suite Runner
//!
//! Gates a run on service readiness, orders the selected suites by tier and
//! runs them. Smoke and api suites run concurrently within their tier; the
//! other tiers run one suite at a time. A failing smoke tier aborts the run.
//! Every case is bounded by its tier's timeout and every suite ends with a
//! best-effort teardown of what it created.

use std::fmt::{Display, Write as _};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use shared::{HarnessConfig, ServiceDescriptor, suite_error, suite_info, suite_warn};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::auth::AuthHelper;
use crate::error::{HarnessError, HarnessResult};
use crate::runtime::{
    ApiClient, CleanupManager, CleanupSummary, CleanupTask, ReadinessProber, ReadinessReport, RequestOptions,
};
use crate::scenarios::TestSuites;
use crate::sequencer::{Tier, sequence, tier_for_path};

const SERVICE_NAME_HEADER: &str = "X-Service-Name";
const API_KEY_HEADER: &str = "X-API-Key";
const HARNESS_SERVICE_NAME: &str = "e2e-test-service";

/// Everything a suite needs to reach the platform, built once per run
pub struct HarnessContext {
    pub config: HarnessConfig,
    pub client: ApiClient,
    pub auth: AuthHelper,
}

impl HarnessContext {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let client = ApiClient::from_config(&config)?;
        let auth = AuthHelper::from_config(client.clone(), &config)?;
        Ok(Self { config, client, auth })
    }

    pub fn service(&self, key: &str) -> HarnessResult<&ServiceDescriptor> {
        Ok(self.config.service(key)?)
    }

    /// Absolute URL of `path` on the service registered under `key`
    pub fn url(&self, key: &str, path: &str) -> HarnessResult<String> {
        Ok(self.service(key)?.endpoint(path))
    }

    pub fn bff(&self, path: &str) -> String {
        join_url(&self.config.bff_url, path)
    }

    pub fn mailpit(&self, path: &str) -> String {
        join_url(&self.config.mailpit_api_url, path)
    }

    /// Headers the message broker expects from a publishing service
    pub fn broker_options(&self) -> RequestOptions {
        RequestOptions::new()
            .header(API_KEY_HEADER, self.config.message_broker_api_key.clone())
            .header(SERVICE_NAME_HEADER, HARNESS_SERVICE_NAME)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
    skipped: usize,
    failures: Vec<String>,
}

/// One executing suite: case bookkeeping plus its teardown registry
pub struct SuiteRun<'a> {
    name: String,
    tier: Tier,
    ctx: &'a HarnessContext,
    case_timeout: Duration,
    cleanup: CleanupManager,
    tally: Mutex<Tally>,
    started: Instant,
}

impl<'a> SuiteRun<'a> {
    pub fn new(name: &str, ctx: &'a HarnessContext, case_timeout: Option<Duration>) -> Self {
        let tier = tier_for_path(name);
        Self {
            name: name.to_string(),
            tier,
            ctx,
            case_timeout: case_timeout.unwrap_or(tier.default_timeout()),
            cleanup: CleanupManager::new(ctx.client.clone(), ctx.config.clone()),
            tally: Mutex::new(Tally::default()),
            started: Instant::now(),
        }
    }

    pub fn ctx(&self) -> &'a HarnessContext {
        self.ctx
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Run one case; `None` when it failed or was skipped
    pub async fn case<T, Fut>(&self, case: &str, body: Fut) -> Option<T>
    where
        Fut: Future<Output = HarnessResult<T>>,
    {
        match timeout(self.case_timeout, body).await {
            Ok(Ok(value)) => {
                suite_info!(self.name, "✅ {}", case);
                self.tally().passed += 1;
                Some(value)
            }
            Ok(Err(HarnessError::Skipped { reason })) => {
                self.skip(case, &reason);
                None
            }
            Ok(Err(e)) => {
                self.record_failure(case, &e);
                None
            }
            Err(_) => {
                let e = HarnessError::Timeout {
                    what: format!("case '{case}'"),
                    after: self.case_timeout,
                };
                self.record_failure(case, &e);
                None
            }
        }
    }

    pub fn skip(&self, case: &str, reason: &str) {
        suite_info!(self.name, "⏭️ Skipped {}: {}", case, reason);
        self.tally().skipped += 1;
    }

    pub fn record_failure(&self, case: &str, error: &dyn Display) {
        suite_error!(self.name, "❌ {}: {}", case, error);
        let mut tally = self.tally();
        tally.failed += 1;
        tally.failures.push(format!("{case}: {error}"));
    }

    /// Register a resource for removal when the suite finishes
    pub fn cleanup(&self, task: CleanupTask) {
        self.cleanup.register(task);
    }

    /// Tear down and produce the suite's report
    pub async fn finish(self) -> SuiteReport {
        let cleanup = self.cleanup.run(&self.name).await;
        let tally = self.tally.into_inner().unwrap_or_else(|e| e.into_inner());
        SuiteReport {
            suite: self.name,
            tier: self.tier,
            passed: tally.passed,
            failed: tally.failed,
            skipped: tally.skipped,
            failures: tally.failures,
            cleanup,
            elapsed: self.started.elapsed(),
        }
    }

    fn tally(&self) -> std::sync::MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub tier: Tier,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
    pub cleanup: CleanupSummary,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub readiness: Option<ReadinessReport>,
    pub suites: Vec<SuiteReport>,
    /// Suites never started because an earlier fail-fast tier failed
    pub not_run: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.not_run.is_empty() && self.suites.iter().all(SuiteReport::success)
    }

    /// Totals of (passed, failed, skipped) cases
    pub fn totals(&self) -> (usize, usize, usize) {
        self.suites.iter().fold((0, 0, 0), |(p, f, s), r| {
            (p + r.passed, f + r.failed, s + r.skipped)
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for report in &self.suites {
            let mark = if report.success() { "✅" } else { "❌" };
            let _ = writeln!(
                out,
                "{} [{}] {}: {} passed, {} failed, {} skipped ({:.2?})",
                mark, report.tier, report.suite, report.passed, report.failed, report.skipped, report.elapsed
            );
            for failure in &report.failures {
                let _ = writeln!(out, "    - {failure}");
            }
        }
        for name in &self.not_run {
            let _ = writeln!(out, "⏹️ {name}: not run");
        }
        let (passed, failed, skipped) = self.totals();
        let _ = writeln!(
            out,
            "\n{} suite(s), {} passed, {} failed, {} skipped in {:.2?}",
            self.suites.len(),
            passed,
            failed,
            skipped,
            self.elapsed
        );
        out
    }
}

/// Which suites to run and how
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub tier: Option<Tier>,
    pub suites: Vec<String>,
    pub skip_readiness: bool,
    /// Overrides every tier's per-case timeout
    pub case_timeout: Option<Duration>,
}

/// Resolve the selection into sequenced suite names
pub fn select_suites(options: &RunOptions) -> HarnessResult<Vec<String>> {
    let mut selected: Vec<String> = if options.suites.is_empty() {
        TestSuites::available_suites().into_iter().map(str::to_string).collect()
    } else {
        for name in &options.suites {
            if TestSuites::find(name).is_none() {
                return Err(HarnessError::UnknownSuite {
                    name: name.clone(),
                    available: TestSuites::available_suites().join(", "),
                });
            }
        }
        options.suites.clone()
    };

    if let Some(tier) = options.tier {
        selected.retain(|name| tier_for_path(name) == tier);
    }
    let mut ordered = sequence(&selected);
    ordered.dedup();
    Ok(ordered)
}

/// Probe the configured readiness services and report every one of them
pub async fn gate(ctx: &HarnessContext) -> HarnessResult<ReadinessReport> {
    let prober = ReadinessProber::from_config(&ctx.config)?;
    Ok(prober.wait_for_services(&ctx.config.readiness_descriptors()).await)
}

pub async fn run_suite(ctx: &HarnessContext, name: &str, case_timeout: Option<Duration>) -> SuiteReport {
    let run = SuiteRun::new(name, ctx, case_timeout);
    shared::logging::log_suite_start(name, &format!("tier {}", run.tier()));

    if let Err(e) = TestSuites::run_suite(name, &run).await {
        run.record_failure("suite", &e);
    }

    let report = run.finish().await;
    if report.success() {
        suite_info!(report.suite, "🏁 {} passed, {} skipped", report.passed, report.skipped);
    } else {
        suite_warn!(report.suite, "🏁 {} of {} case(s) failed", report.failed, report.passed + report.failed);
    }
    report
}

/// Gate, sequence and run the selected suites
pub async fn run_all(ctx: &HarnessContext, options: &RunOptions) -> HarnessResult<RunSummary> {
    let started = Instant::now();
    let selected = select_suites(options)?;
    info!("🧪 Running {} suite(s)", selected.len());

    let readiness = if options.skip_readiness {
        info!("⏭️ Skipping readiness gate");
        None
    } else {
        let report = gate(ctx).await?;
        if !report.all_ready() {
            error!("{}", report.render());
        }
        Some(report.into_result()?)
    };

    let mut suites = Vec::new();
    let mut not_run = Vec::new();
    let mut aborted = false;

    for tier in Tier::ALL {
        let names: Vec<&String> = selected.iter().filter(|name| tier_for_path(name) == tier).collect();
        if names.is_empty() {
            continue;
        }
        if aborted {
            not_run.extend(names.into_iter().cloned());
            continue;
        }

        info!("📋 Tier {}: {} suite(s)", tier, names.len());
        let reports = if tier.allows_parallel() {
            join_all(names.iter().map(|name| run_suite(ctx, name, options.case_timeout))).await
        } else {
            let mut reports = Vec::with_capacity(names.len());
            for name in names {
                reports.push(run_suite(ctx, name, options.case_timeout).await);
            }
            reports
        };

        if tier.fail_fast() && reports.iter().any(|r| !r.success()) {
            warn!("🛑 {} tier failed; aborting remaining tiers", tier);
            aborted = true;
        }
        suites.extend(reports);
    }

    if ctx.config.cleanup_after_tests {
        let cleanup = CleanupManager::new(ctx.client.clone(), ctx.config.clone());
        cleanup.register(CleanupTask::ClearMailbox);
        cleanup.run("global").await;
    }

    Ok(RunSummary {
        readiness,
        suites,
        not_run,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_is_sequenced() {
        let selected = select_suites(&RunOptions::default()).unwrap();
        let tiers: Vec<Tier> = selected.iter().map(|s| tier_for_path(s)).collect();
        let mut sorted = tiers.clone();
        sorted.sort();
        assert_eq!(tiers, sorted);
        assert_eq!(tiers.first(), Some(&Tier::Smoke));
    }

    #[test]
    fn test_select_by_tier_and_unknown_name() {
        let options = RunOptions {
            tier: Some(Tier::Api),
            ..RunOptions::default()
        };
        let selected = select_suites(&options).unwrap();
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.starts_with("api/")));

        let options = RunOptions {
            suites: vec!["smoke/nope".to_string()],
            ..RunOptions::default()
        };
        assert!(matches!(select_suites(&options), Err(HarnessError::UnknownSuite { .. })));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:1/", "/api/x"), "http://h:1/api/x");
        assert_eq!(join_url("http://h:1/api/v1", "messages"), "http://h:1/api/v1/messages");
    }

    #[test]
    fn test_summary_success_requires_all_suites_run() {
        let report = SuiteReport {
            suite: "smoke/a".into(),
            tier: Tier::Smoke,
            passed: 2,
            failed: 0,
            skipped: 1,
            failures: Vec::new(),
            cleanup: CleanupSummary::default(),
            elapsed: Duration::from_millis(5),
        };
        let mut summary = RunSummary {
            readiness: None,
            suites: vec![report],
            not_run: Vec::new(),
            elapsed: Duration::from_millis(5),
        };
        assert!(summary.success());
        assert_eq!(summary.totals(), (2, 0, 1));

        summary.not_run.push("api/b".into());
        assert!(!summary.success());
        assert!(summary.render().contains("api/b: not run"));
    }
}
