// src/error.rs

//! Error types for appliance upgrade operations

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the upgrade engine and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// Local image file is missing
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Remote query or command returned no usable result
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The disk-usage report could not be obtained or parsed
    #[error("Could not get free space: {0}")]
    FreeSpaceUnavailable(String),

    /// Not enough room in the volume group to install an image
    #[error("Not enough free space to install OS: {available:.2} GB free, {required:.2} GB required")]
    InsufficientSpace { required: f64, available: f64 },

    /// Volume never reported the image as installed
    #[error("Installation of {image} on volume {volume} did not complete within {}s", .timeout.as_secs())]
    InstallTimeout {
        image: String,
        volume: String,
        timeout: Duration,
    },

    /// Volume never came up as the active one
    #[error("Reboot to volume {volume} did not complete within {}s", .timeout.as_secs())]
    RebootTimeout { volume: String, timeout: Duration },

    /// Uploaded image does not match the local file
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// Operation not implemented for this device type
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err.to_string())
    }
}

/// Result type for upgrade operations
pub type Result<T> = std::result::Result<T, Error>;
