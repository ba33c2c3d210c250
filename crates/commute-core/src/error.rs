//! Core error types for commute-core.
//!
//! This module defines the error hierarchy using thiserror. History errors
//! during estimation are logged and absorbed by the fallbacks; they only
//! reach a caller when the store cannot be opened at all. The CLI reports
//! every failure as a [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for commute-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Work schedule errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Historical store errors
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Output serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Work schedule errors. Rejected at call time, never corrected silently.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Start/end ordering or buffer constraint violated
    #[error("Invalid schedule (start {start}, end {end}, buffer {buffer_minutes} min): {reason}")]
    InvalidSchedule {
        start: String,
        end: String,
        buffer_minutes: i32,
        reason: String,
    },

    /// A clock time string could not be parsed as HH:MM
    #[error("Invalid clock time '{0}': expected HH:MM")]
    InvalidTime(String),
}

/// Historical store errors.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The backing key-value store could not be read or written
    #[error("History store unavailable: {0}")]
    Unavailable(String),

    /// Stored history could not be decoded
    #[error("History data corrupt: {0}")]
    Corrupt(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value outside its documented range
    #[error("Value {value} for '{field}' outside range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for HistoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                HistoryError::Unavailable("database is locked".to_string())
            }
            _ => HistoryError::Unavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Corrupt(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
