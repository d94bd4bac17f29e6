//! Error types for the storage volume registry.
//!
//! Every failure the registry can report is a variant of [`VolumeError`].
//! Callers that only care about the broad category can use
//! [`VolumeError::kind`].

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the storage volume registry.
#[derive(Debug, Error)]
pub enum VolumeError {
    // Lookup errors
    #[error("Unknown storage volume \"{name}\"")]
    NotFound { name: String },

    #[error("No default storage volume is set and the builtin storage volume does not exist")]
    NoDefaultVolume,

    #[error("Storage volume \"{name}\" already exists")]
    AlreadyExists { name: String },

    #[error("Storage volume {name} is disabled")]
    Disabled { name: String },

    #[error("Storage volume \"{name}\" is in use: {reason}")]
    InUse { name: String, reason: String },

    // Configuration errors
    #[error("{message}")]
    InvalidConfiguration { message: String },

    // Directory service / path allocation errors
    #[error("Upstream operation failed: {message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{0}")]
    Internal(String),
}

/// Broad failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Disabled,
    InvalidConfiguration,
    InUse,
    UpstreamFailure,
    Internal,
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, VolumeError>;

impl From<rusqlite::Error> for VolumeError {
    fn from(err: rusqlite::Error) -> Self {
        VolumeError::Upstream {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::io::Error> for VolumeError {
    fn from(err: std::io::Error) -> Self {
        VolumeError::Upstream {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        VolumeError::Upstream {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl VolumeError {
    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        VolumeError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an upstream error without an underlying cause.
    pub fn upstream(message: impl Into<String>) -> Self {
        VolumeError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        VolumeError::NotFound { name: name.into() }
    }

    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VolumeError::NotFound { .. } | VolumeError::NoDefaultVolume => ErrorKind::NotFound,
            VolumeError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            VolumeError::Disabled { .. } => ErrorKind::Disabled,
            VolumeError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            VolumeError::InUse { .. } => ErrorKind::InUse,
            VolumeError::Upstream { .. } => ErrorKind::UpstreamFailure,
            VolumeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error was caused by the caller's request rather than by
    /// the directory service or the registry itself.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::UpstreamFailure | ErrorKind::Internal
        )
    }
}
