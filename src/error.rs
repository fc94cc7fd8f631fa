//! Unified error model for the asset engine.
//! A missing package or an unauthorized file is not an error; those are
//! `None` returns on the relevant operations. The variants here cover the
//! failures that abort an operation, plus the mapping to HTTP status codes
//! for responses the middleware has to produce itself.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    /// A configured file could not be read. Aborts the whole package
    /// resolution; no partial results are kept.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A virtual-path reference could not be resolved by the host.
    #[error("failed to resolve '{uri}': {message}")]
    Resolution { uri: String, message: String },

    /// A filter name from the configuration has no registry entry.
    #[error("unknown filter '{name}'")]
    UnknownFilter { name: String },

    /// A filter rejected its input.
    #[error("filter '{name}' failed: {message}")]
    Filter { name: String, message: String },

    /// The configuration or an override of it was malformed.
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl AssetError {
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AssetError::Read { path: path.into(), source }
    }

    pub fn resolution(uri: impl Into<String>, message: impl Into<String>) -> Self {
        AssetError::Resolution { uri: uri.into(), message: message.into() }
    }

    pub fn unknown_filter(name: impl Into<String>) -> Self {
        AssetError::UnknownFilter { name: name.into() }
    }

    pub fn filter(name: impl Into<String>, message: impl Into<String>) -> Self {
        AssetError::Filter { name: name.into(), message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        AssetError::Config { message: message.into() }
    }

    /// Map to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AssetError::Read { .. } => 503,
            AssetError::Resolution { .. } => 500,
            AssetError::UnknownFilter { .. } => 500,
            AssetError::Filter { .. } => 500,
            AssetError::Config { .. } => 500,
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;
