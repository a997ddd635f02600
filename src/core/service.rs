use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::core::backfill::{BackfillOrchestrator, BackfillOutcome};
use crate::core::cache::{LatestValue, ReadCache};
use crate::core::dedup::DedupPolicy;
use crate::core::import::{DeleteOutcome, ImportEngine, ImportOutcome};
use crate::core::observe::{ObservationScheduler, RegistrationReport};
use crate::db::Database;
use crate::error::{Result, SyncError};
use crate::models::checkpoint::ImportMode;
use crate::models::config::Config;
use crate::models::metric::MetricKind;
use crate::models::sync_state::SyncState;
use crate::source::HealthSource;

const DENIED_MESSAGE: &str =
    "Access to health data was denied. Grant read and write access to body measurements and try again.";

pub struct SyncService {
    engine: ImportEngine,
    state: SyncState,
    backfill: BackfillOrchestrator,
    cache: ReadCache,
    scheduler: ObservationScheduler,
}

impl SyncService {
    pub fn new(
        engine: ImportEngine,
        state: SyncState,
        backfill: BackfillOrchestrator,
        cache: ReadCache,
    ) -> Self {
        Self {
            engine,
            state,
            backfill,
            cache,
            scheduler: ObservationScheduler::new(),
        }
    }

    /// Build the service from config, loading persisted state from `db`.
    pub fn from_config(config: &Config, db: Database, source: Arc<dyn HealthSource>) -> Result<Self> {
        let policy = DedupPolicy::from_config(&config.sync)?;
        let state = SyncState::new(
            db.backfill_complete().map_err(SyncError::storage)?,
            config.sync.enabled.iter().copied(),
        );
        let cache = ReadCache::new(Arc::clone(&source), config.sync.cache_ttl()?);
        let engine = ImportEngine::new(db, source, policy, &config.sync.app_source_id);
        let backfill = BackfillOrchestrator::new(config.sync.backfill_kinds.iter().copied());
        Ok(Self::new(engine, state, backfill, cache))
    }

    pub fn engine(&self) -> &ImportEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ImportEngine {
        &mut self.engine
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Run the historical backfill unless it already completed, then start
    /// observing. Only an authorization denial or failure to persist the
    /// flag is an error; per-kind failures are in the outcome.
    pub fn trigger_backfill_if_needed(&mut self) -> Result<BackfillOutcome> {
        let mut kinds: Vec<MetricKind> = self.backfill.kinds().to_vec();
        kinds.extend(self.state.enabled.iter().copied());
        kinds.sort();
        kinds.dedup();

        let granted = self
            .engine
            .source()
            .request_authorization(&kinds)
            .map_err(|e| SyncError::Authorization(format!("{DENIED_MESSAGE} ({e:#})")))?;
        if !granted {
            return Err(SyncError::Authorization(DENIED_MESSAGE.to_string()));
        }

        let outcome = self.backfill.run(&mut self.engine, &mut self.state)?;
        if outcome.is_complete() {
            self.start_observing();
        }
        Ok(outcome)
    }

    pub fn trigger_incremental_sync(&mut self, kind: MetricKind) -> Result<ImportOutcome> {
        let result = self.engine.run_kind(kind, ImportMode::Incremental);
        if let Err(e) = &result {
            tracing::warn!(kind = %kind, error = %e, "Incremental sync failed");
        }
        result
    }

    pub fn read_latest_cached(
        &self,
        kind: MetricKind,
        force_refresh: bool,
    ) -> Result<Option<LatestValue>> {
        self.cache.get(kind, force_refresh)
    }

    pub fn start_observing(&mut self) -> RegistrationReport {
        self.scheduler.register(&mut self.engine, &self.state)
    }

    pub fn stop_observing(&mut self) {
        self.scheduler.deregister_all();
    }

    pub fn process_pending(&mut self) -> Vec<MetricKind> {
        self.scheduler.process_pending(&mut self.engine)
    }

    /// Process watch events for `limit` (or indefinitely).
    pub fn watch_for(&mut self, limit: Option<Duration>) -> usize {
        self.scheduler.run(&mut self.engine, limit)
    }

    /// Remove samples from the source and the local store. Failures are
    /// surfaced, not retried.
    pub fn delete_samples(
        &mut self,
        kind: MetricKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DeleteOutcome> {
        self.engine.delete_range(kind, from, to)
    }
}
