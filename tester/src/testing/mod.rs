//! Testing Framework
//!
//! Assertions over platform responses and helpers for loosely shaped JSON.

pub mod assertions;
pub mod json;

pub use assertions::{AssertionResult, status};
