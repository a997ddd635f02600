use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque incremental cursor minted by the external source.
///
/// The sync engine only stores and hands it back; decoding is the business
/// of the source adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorToken(pub Vec<u8>);

impl AnchorToken {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for AnchorToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Per-kind record of how much of the source has been consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub anchor: Option<AnchorToken>,
    pub last_processed: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// The `since` filter to pass to the source. An anchor makes the date
    /// fallback inapplicable.
    pub fn since_filter(&self) -> Option<DateTime<Utc>> {
        if self.anchor.is_some() {
            None
        } else {
            self.last_processed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Resume from the stored checkpoint.
    Incremental,
    /// Fetch the full history, ignoring any stored checkpoint.
    Historical,
}

impl ImportMode {
    pub fn notifies(&self) -> bool {
        matches!(self, Self::Incremental)
    }
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Historical => write!(f, "historical"),
        }
    }
}
