//! Error types for replay decoding and telemetry processing.
//!
//! All fatal failures surface as [`ReplayError`]. Decode failures carry the byte offset at
//! which the read failed so a corrupt or truncated replay can be diagnosed from the message
//! alone.
//!
//! ## Error Categories
//!
//! - **Format Errors**: unsupported version, implausible counts, malformed strings
//! - **Bounds Errors**: any read that would run past the end of the buffer
//! - **Driver Errors**: the requested driver is absent or the located car block disagrees
//! - **Trace Errors**: channel sequences whose lengths do not match the frame count
//! - **I/O and Config Errors**: file access, configuration and serialization failures
//!
//! Two conditions are deliberately *not* errors: a missing or unreadable trailer metadata
//! block only changes how a driver is located, and an alignment search without a candidate
//! returns `None`.
//!
//! ```rust
//! use ghostline::ReplayError;
//!
//! let error = ReplayError::out_of_bounds(1024, 4, 1022);
//! assert_eq!(error.offset(), Some(1024));
//! assert!(error.is_corrupt_data());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

/// Main error type for replay decoding and telemetry processing.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("Unsupported replay version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: i32, found: i32 },

    #[error(
        "Read of {needed} bytes at offset {offset} exceeds buffer ({available} bytes remaining)"
    )]
    OutOfBounds { offset: usize, needed: usize, available: usize },

    #[error(
        "Invalid string length {length} at offset {offset} ({available} bytes after the prefix)"
    )]
    InvalidStringLength { offset: usize, length: u32, available: usize },

    #[error("String at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Invalid {context} {value} at offset {offset}")]
    InvalidCount { context: String, value: i64, offset: usize },

    #[error("Driver '{driver}' not found ({strategy})")]
    DriverNotFound { driver: String, strategy: String },

    #[error("Driver mismatch at car {index}: expected '{expected}', found '{found}'")]
    DriverMismatch { expected: String, found: String, index: usize },

    #[error("Invalid telemetry trace: {details}")]
    InvalidTrace { details: String },

    #[error("Replay file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Telemetry serialization failed")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Background decode task failed: {details}")]
    Task { details: String },
}

impl ReplayError {
    /// Byte offset the failure refers to, for offset-qualified decode errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ReplayError::OutOfBounds { offset, .. }
            | ReplayError::InvalidStringLength { offset, .. }
            | ReplayError::InvalidUtf8 { offset, .. }
            | ReplayError::InvalidCount { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns whether this error indicates a damaged or truncated replay buffer.
    pub fn is_corrupt_data(&self) -> bool {
        match self {
            ReplayError::OutOfBounds { .. } => true,
            ReplayError::InvalidStringLength { .. } => true,
            ReplayError::InvalidUtf8 { .. } => true,
            ReplayError::InvalidCount { .. } => true,
            ReplayError::DriverMismatch { .. } => true,
            ReplayError::UnsupportedVersion { .. } => false,
            ReplayError::DriverNotFound { .. } => false,
            ReplayError::InvalidTrace { .. } => false,
            ReplayError::File { .. } => false,
            ReplayError::Config { .. } => false,
            ReplayError::Serialization { .. } => false,
            ReplayError::Task { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReplayError::UnsupportedVersion { .. } => vec![
                "Re-record the session with a simulator build that writes version 16 replays",
                "Check that the file is a replay and not another container",
            ],
            ReplayError::OutOfBounds { .. }
            | ReplayError::InvalidStringLength { .. }
            | ReplayError::InvalidUtf8 { .. }
            | ReplayError::InvalidCount { .. } => vec![
                "Check that the replay was copied completely",
                "Re-save the replay from the simulator",
                "Verify the file was not modified by another tool",
            ],
            ReplayError::DriverNotFound { .. } => vec![
                "List the drivers contained in the replay",
                "Check the driver name spelling",
                "Try a shorter part of the driver name",
            ],
            ReplayError::DriverMismatch { .. } => vec![
                "The trailer metadata disagrees with the car blocks",
                "Strip the trailer metadata and retry with a sequential scan",
            ],
            ReplayError::InvalidTrace { .. } => vec![
                "Ensure every channel has exactly numFrames samples",
                "Regenerate the telemetry export from the replay",
            ],
            ReplayError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            ReplayError::Config { .. } => vec![
                "Check configuration values are positive and within range",
                "Remove the key to fall back to the default",
            ],
            ReplayError::Serialization { .. } => vec![
                "Verify the JSON document is a telemetry export",
                "Check for truncated JSON output",
            ],
            ReplayError::Task { .. } => vec!["Retry the decode on the calling thread"],
        }
    }

    /// Helper constructor for bounds failures.
    pub fn out_of_bounds(offset: usize, needed: usize, available: usize) -> Self {
        ReplayError::OutOfBounds { offset, needed, available }
    }

    /// Helper constructor for implausible counts read from the buffer.
    pub fn invalid_count(context: impl Into<String>, value: i64, offset: usize) -> Self {
        ReplayError::InvalidCount { context: context.into(), value, offset }
    }

    /// Helper constructor for a driver that could not be located.
    pub fn driver_not_found(driver: impl Into<String>, strategy: impl Into<String>) -> Self {
        ReplayError::DriverNotFound { driver: driver.into(), strategy: strategy.into() }
    }

    /// Helper constructor for malformed telemetry traces.
    pub fn invalid_trace(details: impl Into<String>) -> Self {
        ReplayError::InvalidTrace { details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        ReplayError::File { path, source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        ReplayError::Config { details: details.into() }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        ReplayError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
