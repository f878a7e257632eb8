//! Shared error types for the platform test harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown service key: {key}")]
    UnknownService { key: String },

    #[error("Failed to read env file {path}: {message}")]
    EnvFile { path: String, message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
