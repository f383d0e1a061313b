//! Unified error handling for Quadromon
//!
//! This crate provides a single error type used across all Quadromon components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using QuadroError
pub type Result<T> = std::result::Result<T, QuadroError>;

/// Unified error type for all Quadromon operations
#[derive(thiserror::Error, Debug)]
pub enum QuadroError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Sensor Errors
    // ============================================================================
    /// The latest snapshot is older than the freshness window, or no report
    /// has been accepted yet.
    #[error("No data available")]
    NoData,

    #[error("Invalid channel {channel} for {kind} (device has {count})")]
    InvalidChannel {
        kind: String,
        channel: usize,
        count: usize,
    },

    // ============================================================================
    // Device Errors
    // ============================================================================
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Multiple devices attached ({0}), a device name is required")]
    AmbiguousDevice(usize),

    #[error("Device disconnected: {0}")]
    DeviceDisconnected(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Configuration file too large: {path} ({size} bytes, max {max_size} bytes)")]
    ConfigTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    #[error("Invalid socket path {path}: {reason}")]
    InvalidSocketPath {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Daemon and IPC Errors
    // ============================================================================
    #[error("Daemon not available")]
    DaemonNotAvailable,

    #[error("Daemon connection failed: {0}")]
    DaemonConnection(String),

    #[error("Daemon response error: {0}")]
    DaemonResponse(String),

    #[error("IPC protocol error: {0}")]
    IpcProtocol(String),

    #[error("Message too large: {size} bytes (max {max_size} bytes)")]
    MessageTooLarge {
        size: usize,
        max_size: usize,
    },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl QuadroError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid socket path error
    pub fn invalid_socket_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidSocketPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for the stale-data condition, which callers usually render
    /// instead of treating as a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

// Allow converting from String to QuadroError
impl From<String> for QuadroError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to QuadroError
impl From<&str> for QuadroError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_display() {
        assert_eq!(QuadroError::NoData.to_string(), "No data available");
        assert!(QuadroError::NoData.is_no_data());
        assert!(!QuadroError::generic("x").is_no_data());
    }

    #[test]
    fn test_invalid_channel_display() {
        let err = QuadroError::InvalidChannel {
            kind: "temperature".to_string(),
            channel: 7,
            count: 4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid channel 7 for temperature (device has 4)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let err: QuadroError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, QuadroError::Io(_)));
    }
}
