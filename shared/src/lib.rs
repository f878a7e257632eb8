//! Shared types for the platform test harness
//!
//! Contains the immutable harness configuration, the value types passed
//! between the prober, the HTTP client and the suites, and logging setup.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

pub use config::{
    HarnessConfig, HarnessConfigBuilder, PerfSettings, ReadinessSettings, SERVICE_CATALOG,
    ServiceDescriptor,
};
