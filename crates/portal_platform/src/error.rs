//! # Platform Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or probing the platform.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML or has unknown keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
