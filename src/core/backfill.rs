use serde::Serialize;

use crate::core::import::ImportEngine;
use crate::error::{Result, SyncError};
use crate::models::checkpoint::ImportMode;
use crate::models::metric::MetricKind;
use crate::models::sync_state::{BackfillState, SyncState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackfillOutcome {
    AlreadyComplete,
    Completed { inserted: usize },
    Incomplete { failed: Vec<MetricKind> },
}

impl BackfillOutcome {
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Incomplete { .. })
    }
}

/// Imports the designated kinds as one unit: any failure leaves the flag
/// unset and the whole set runs again next time.
pub struct BackfillOrchestrator {
    kinds: Vec<MetricKind>,
}

impl BackfillOrchestrator {
    pub fn new(kinds: impl IntoIterator<Item = MetricKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn kinds(&self) -> &[MetricKind] {
        &self.kinds
    }

    /// Run a historical pass for every designated kind, one after another.
    ///
    /// Per-kind failures are logged and reported in the outcome; only a
    /// failure to persist the completion flag is returned as an error.
    pub fn run(&self, engine: &mut ImportEngine, state: &mut SyncState) -> Result<BackfillOutcome> {
        if state.backfill == BackfillState::Completed {
            return Ok(BackfillOutcome::AlreadyComplete);
        }

        state.backfill = BackfillState::Running;
        tracing::info!(kinds = self.kinds.len(), "Historical backfill starting");

        let mut failed = Vec::new();
        let mut inserted = 0;
        for &kind in &self.kinds {
            match engine.run_kind(kind, ImportMode::Historical) {
                Ok(outcome) => inserted += outcome.inserted_count,
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Historical import failed");
                    failed.push(kind);
                }
            }
        }

        if !failed.is_empty() {
            state.backfill = BackfillState::NotStarted;
            tracing::warn!(failed = ?failed, "Historical backfill incomplete, will retry");
            return Ok(BackfillOutcome::Incomplete { failed });
        }

        if let Err(e) = engine.database().set_backfill_complete() {
            state.backfill = BackfillState::NotStarted;
            return Err(SyncError::storage(e));
        }
        state.backfill = BackfillState::Completed;
        tracing::info!(inserted, "Historical backfill complete");
        Ok(BackfillOutcome::Completed { inserted })
    }
}
