use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::metric::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillState {
    NotStarted,
    Running,
    Completed,
}

/// Process-wide sync state, injected into the orchestrator and scheduler
/// instead of being read from ambient storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub backfill: BackfillState,
    pub enabled: BTreeSet<MetricKind>,
}

impl SyncState {
    pub fn new(backfill_complete: bool, enabled: impl IntoIterator<Item = MetricKind>) -> Self {
        Self {
            backfill: if backfill_complete {
                BackfillState::Completed
            } else {
                BackfillState::NotStarted
            },
            enabled: enabled.into_iter().collect(),
        }
    }

    pub fn backfill_complete(&self) -> bool {
        self.backfill == BackfillState::Completed
    }

    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        self.enabled.contains(&kind)
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(false, MetricKind::ALL)
    }
}
