use thiserror::Error;

use crate::models::metric::MetricKind;

/// Failures of a sync operation.
///
/// Fetch and storage failures are per-kind and retried on the next trigger;
/// delete and authorization failures are meant to be shown to the user.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The external source could not be queried
    #[error("source fetch failed for {kind}: {message}")]
    SourceFetch { kind: MetricKind, message: String },

    /// Local sample or checkpoint storage failed
    #[error("local storage error: {0}")]
    Storage(String),

    /// Removing stored values failed
    #[error("failed to delete {kind} samples: {message}")]
    Delete { kind: MetricKind, message: String },

    /// Health data access was not granted
    #[error("{0}")]
    Authorization(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn fetch(kind: MetricKind, err: anyhow::Error) -> Self {
        Self::SourceFetch {
            kind,
            message: format!("{err:#}"),
        }
    }

    pub fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }

    /// Short machine-readable code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceFetch { .. } => "source_error",
            Self::Storage(_) => "storage_error",
            Self::Delete { .. } => "delete_error",
            Self::Authorization(_) => "authorization_denied",
            Self::Config(_) => "config_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
