use std::path::PathBuf;
use thiserror::Error;

use crate::share::ShareUrl;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create config directory: {0}")]
    CreateDir(std::io::Error),
}

/// Errors reported by a share transport backend
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Authentication rejected: {0}")]
    AccessDenied(String),

    #[error("Remote path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session establishment errors. Unlike the listing and transfer errors
/// these keep their underlying cause.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Connection failed to {url}: {source}")]
    Handshake {
        url: ShareUrl,
        source: TransportError,
    },

    #[error("Timeout after {seconds}s connecting to {url}")]
    Timeout { url: ShareUrl, seconds: u64 },
}

/// Directory listing errors. Underlying causes are logged where they
/// occur and not carried to the consumer.
#[derive(Error, Debug)]
pub enum BrowseError {
    #[error("No active share session")]
    NotConnected,

    #[error("Browse target not found")]
    TargetNotFound,

    #[error("Listing failed")]
    Listing,
}

/// Errors raised before a transfer stream exists. Failures inside a
/// running transfer surface as a terminal stream state instead.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No active share session")]
    NotConnected,

    #[error("Failed to stage local file for '{name}': {source}")]
    Staging {
        name: String,
        source: std::io::Error,
    },
}

impl TransportError {
    /// True when the failure indicates a missing remote path rather than
    /// a connection or protocol problem.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}
