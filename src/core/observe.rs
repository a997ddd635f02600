use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::core::import::ImportEngine;
use crate::models::checkpoint::ImportMode;
use crate::models::metric::MetricKind;
use crate::models::sync_state::SyncState;
use crate::source::{WatchEvent, WatchHandle};

#[derive(Debug, Default, Serialize)]
pub struct RegistrationReport {
    pub watched: Vec<MetricKind>,
    pub watch_failed: Vec<MetricKind>,
    pub caught_up: Vec<MetricKind>,
    pub catch_up_failed: Vec<MetricKind>,
}

/// Holds one watch per enabled kind. Events arrive on a single channel
/// drained by the thread that owns the engine.
pub struct ObservationScheduler {
    handles: Vec<WatchHandle>,
    tx: Sender<WatchEvent>,
    rx: Receiver<WatchEvent>,
}

impl Default for ObservationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            handles: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn watched_kinds(&self) -> Vec<MetricKind> {
        self.handles.iter().map(WatchHandle::kind).collect()
    }

    /// Drop every registered watch, then discard events they already queued.
    pub fn deregister_all(&mut self) {
        let count = self.handles.len();
        self.handles.clear();
        while self.rx.try_recv().is_ok() {}
        if count > 0 {
            tracing::debug!(count, "Deregistered watches");
        }
    }

    /// (Re-)register watches for every enabled kind.
    ///
    /// Failures are per kind: a kind that cannot be watched or caught up is
    /// logged and the rest carry on.
    pub fn register(&mut self, engine: &mut ImportEngine, state: &SyncState) -> RegistrationReport {
        self.deregister_all();

        let mut report = RegistrationReport::default();
        for &kind in &state.enabled {
            match engine.source().watch(kind, self.tx.clone()) {
                Ok(handle) => {
                    self.handles.push(handle);
                    report.watched.push(kind);
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Failed to register watch");
                    report.watch_failed.push(kind);
                }
            }
        }

        // Catch up on anything that changed while no watch was registered.
        if state.backfill_complete() {
            for &kind in &state.enabled {
                match engine.run_kind(kind, ImportMode::Incremental) {
                    Ok(_) => report.caught_up.push(kind),
                    Err(e) => {
                        tracing::warn!(kind = %kind, error = %e, "Catch-up import failed");
                        report.catch_up_failed.push(kind);
                    }
                }
            }
        }

        tracing::info!(
            watched = report.watched.len(),
            failed = report.watch_failed.len(),
            "Observation registered"
        );
        report
    }

    /// Handle every queued event. Repeated events for a kind collapse into a
    /// single pass. Returns the kinds that were synced.
    pub fn process_pending(&mut self, engine: &mut ImportEngine) -> Vec<MetricKind> {
        let mut pending = BTreeSet::new();
        self.drain_into(&mut pending);
        for &kind in &pending {
            sync_kind(engine, kind);
        }
        pending.into_iter().collect()
    }

    /// Block on the event channel, syncing kinds as events arrive, until
    /// `limit` elapses (or forever when `None`). Returns the number of passes run.
    pub fn run(&mut self, engine: &mut ImportEngine, limit: Option<Duration>) -> usize {
        let deadline = limit.map(|d| Instant::now() + d);
        let mut passes = 0;
        loop {
            let event = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.rx.recv_timeout(remaining) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.rx.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            let mut pending = BTreeSet::from([event.kind]);
            self.drain_into(&mut pending);
            for kind in pending {
                sync_kind(engine, kind);
                passes += 1;
            }
        }
        passes
    }

    fn drain_into(&self, pending: &mut BTreeSet<MetricKind>) {
        while let Ok(event) = self.rx.try_recv() {
            pending.insert(event.kind);
        }
    }
}

fn sync_kind(engine: &mut ImportEngine, kind: MetricKind) {
    if let Err(e) = engine.run_kind(kind, ImportMode::Incremental) {
        tracing::warn!(kind = %kind, error = %e, "Incremental import failed");
    }
}
