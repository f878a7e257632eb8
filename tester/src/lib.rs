//! Platform Test Harness
//!
//! Test harness for an e-commerce microservices platform whose services are
//! reached only over HTTP.
//!
//! ## Main Interface
//!
//! Suites are registered by name in [`scenarios::TestSuites`]; the first path
//! segment of a name is its tier. [`runner::run_all`] gates a run on service
//! readiness, sequences the selected suites by tier and runs them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tester::{HarnessContext, RunOptions, Tier, run_all};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = shared::HarnessConfig::from_env()?;
//! let ctx = HarnessContext::new(config)?;
//!
//! let options = RunOptions {
//!     tier: Some(Tier::Smoke),
//!     ..RunOptions::default()
//! };
//! let summary = run_all(&ctx, &options).await?;
//! println!("{}", summary.render());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod auth;
pub mod error;
pub mod fixtures;
pub mod runner;
pub mod runtime;
pub mod scenarios;
pub mod sequencer;
pub mod testing;

// Main interfaces - re-exported at crate root for convenience
pub use auth::{AuthHelper, Registration, SessionOutcome, SessionState};
pub use error::{HarnessError, HarnessResult};
pub use runner::{HarnessContext, RunOptions, RunSummary, SuiteReport, SuiteRun, run_all, run_suite};
pub use sequencer::{Tier, sequence, tier_for_path};

// Supporting types
pub use runtime::{ApiClient, ApiError, ApiResponse, ReadinessProber, ReadinessReport, RequestOptions, RetryPolicy};
pub use scenarios::TestSuites;
pub use testing::AssertionResult;
