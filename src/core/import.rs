use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::core::dedup::{DedupIndex, DedupPolicy};
use crate::db::Database;
use crate::error::{Result, SyncError};
use crate::models::checkpoint::{Checkpoint, ImportMode};
use crate::models::metric::{MetricKind, RawSample, Sample, normalize};
use crate::source::HealthSource;

/// Receives one call per externally sourced sample accepted by an
/// incremental pass.
pub trait ImportNotifier: Send {
    fn sample_imported(&self, kind: MetricKind, date: DateTime<Utc>);
}

/// Only records imports in the log.
pub struct TracingNotifier;

impl ImportNotifier for TracingNotifier {
    fn sample_imported(&self, kind: MetricKind, date: DateTime<Utc>) {
        tracing::info!(kind = %kind, date = %date, "New sample from another source");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImportNotice {
    pub kind: MetricKind,
    pub date: DateTime<Utc>,
}

/// Forwards notices to a channel for the notification layer to batch.
pub struct ChannelNotifier {
    tx: Sender<ImportNotice>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<ImportNotice>) -> Self {
        Self { tx }
    }
}

impl ImportNotifier for ChannelNotifier {
    fn sample_imported(&self, kind: MetricKind, date: DateTime<Utc>) {
        if self.tx.send(ImportNotice { kind, date }).is_err() {
            tracing::debug!(kind = %kind, "Notice receiver dropped");
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    /// Whether anything was written to local storage.
    pub inserted: bool,
    pub inserted_count: usize,
    pub duplicate_count: usize,
    /// Samples dropped because their value was not a finite number.
    pub invalid_count: usize,
    /// Newest date among all processed samples, duplicates and invalid
    /// values included.
    pub newest_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub removed_from_source: usize,
    pub removed_locally: usize,
}

/// Owns local sample storage and checkpoints. Every pass takes `&mut self`,
/// so passes never overlap.
///
/// A pass can be abandoned at any point before the checkpoint write: inserts
/// are individually durable and re-running the pass finds them as duplicates.
pub struct ImportEngine {
    db: Database,
    source: Arc<dyn HealthSource>,
    policy: DedupPolicy,
    app_source_id: String,
    notifier: Box<dyn ImportNotifier>,
}

impl ImportEngine {
    pub fn new(
        db: Database,
        source: Arc<dyn HealthSource>,
        policy: DedupPolicy,
        app_source_id: &str,
    ) -> Self {
        Self {
            db,
            source,
            policy,
            app_source_id: app_source_id.to_string(),
            notifier: Box::new(TracingNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn ImportNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn set_notifier(&mut self, notifier: Box<dyn ImportNotifier>) {
        self.notifier = notifier;
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn source(&self) -> &Arc<dyn HealthSource> {
        &self.source
    }

    pub fn policy(&self) -> &DedupPolicy {
        &self.policy
    }

    pub fn app_source_id(&self) -> &str {
        &self.app_source_id
    }

    /// Run a pass using the kind's canonical unit and encoding.
    pub fn run_kind(&mut self, kind: MetricKind, mode: ImportMode) -> Result<ImportOutcome> {
        self.run_import(kind, kind.canonical_unit(), kind.is_percent_encoded(), mode)
    }

    pub fn run_import(
        &mut self,
        kind: MetricKind,
        unit: &str,
        percent_encoded: bool,
        mode: ImportMode,
    ) -> Result<ImportOutcome> {
        let checkpoint = self.db.load_checkpoint(kind).map_err(SyncError::storage)?;

        let batch = match mode {
            ImportMode::Incremental => self.source.fetch_incremental_batch(
                kind,
                unit,
                checkpoint.anchor.as_ref(),
                checkpoint.since_filter(),
            ),
            ImportMode::Historical => self.source.fetch_incremental_batch(kind, unit, None, None),
        }
        .map_err(|e| SyncError::fetch(kind, e))?;

        let new_anchor = batch
            .new_anchor
            .filter(|a| checkpoint.anchor.as_ref() != Some(a));
        let (samples, rejected) = normalize_batch(kind, batch.samples, percent_encoded);

        tracing::debug!(
            kind = %kind,
            mode = %mode,
            fetched = samples.len() + rejected.len(),
            new_anchor = new_anchor.is_some(),
            "Fetched batch"
        );

        if samples.is_empty() && rejected.is_empty() {
            if let Some(anchor) = &new_anchor {
                self.db.save_anchor(kind, anchor).map_err(SyncError::storage)?;
            }
            return Ok(ImportOutcome::default());
        }

        let mut outcome = self.apply_batch(kind, &samples, mode)?;
        outcome.invalid_count = rejected.len();
        outcome.newest_date = outcome.newest_date.max(rejected.iter().max().copied());

        if let Some(anchor) = &new_anchor {
            self.db.save_anchor(kind, anchor).map_err(SyncError::storage)?;
        }
        if let Some(newest) = outcome.newest_date {
            self.advance_last_processed(kind, &checkpoint, newest)?;
        }
        self.db
            .set_last_import_at(Utc::now())
            .map_err(SyncError::storage)?;

        tracing::info!(
            kind = %kind,
            mode = %mode,
            inserted = outcome.inserted_count,
            duplicates = outcome.duplicate_count,
            invalid = outcome.invalid_count,
            "Import pass complete"
        );
        Ok(outcome)
    }

    /// Dedup `samples` (ascending by date) against local storage and insert
    /// the novel ones.
    fn apply_batch(
        &mut self,
        kind: MetricKind,
        samples: &[RawSample],
        mode: ImportMode,
    ) -> Result<ImportOutcome> {
        let tolerance = self.policy.date_tolerance();
        let value_tolerance = self.policy.value_tolerance(kind);
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Ok(ImportOutcome::default());
        };

        let from = first
            .date
            .checked_sub_signed(tolerance)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let to = last
            .date
            .checked_add_signed(tolerance)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let existing = self
            .db
            .samples_in_window(kind, from, to)
            .map_err(SyncError::storage)?;
        let mut index =
            DedupIndex::from_entries(tolerance, existing.iter().map(|s| (s.date, s.value)));

        let mut outcome = ImportOutcome::default();
        for raw in samples {
            outcome.newest_date = outcome.newest_date.max(Some(raw.date));

            if index.is_duplicate(&raw.date, raw.value, value_tolerance) {
                outcome.duplicate_count += 1;
                continue;
            }

            let sample = Sample::new(kind, raw.value, raw.date).with_source(raw.source_id.clone());
            self.db.insert_sample(&sample).map_err(SyncError::storage)?;
            index.insert(sample.date, sample.value);
            outcome.inserted_count += 1;
            outcome.inserted = true;

            if mode.notifies() && !self.is_self_originated(&raw.source_id) {
                self.notifier.sample_imported(kind, raw.date);
            }
        }
        Ok(outcome)
    }

    /// Delete samples with `from <= date <= to` from the source, then from
    /// local storage.
    pub fn delete_range(
        &mut self,
        kind: MetricKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DeleteOutcome> {
        let delete_error = |e: anyhow::Error| SyncError::Delete {
            kind,
            message: format!("{e:#}"),
        };
        let removed_from_source = self.source.delete(kind, from, to).map_err(delete_error)?;
        let removed_locally = self
            .db
            .delete_samples(kind, from, to)
            .map_err(delete_error)?;
        tracing::info!(
            kind = %kind,
            removed_from_source,
            removed_locally,
            "Deleted samples"
        );
        Ok(DeleteOutcome {
            removed_from_source,
            removed_locally,
        })
    }

    fn is_self_originated(&self, source_id: &Option<String>) -> bool {
        source_id.as_deref() == Some(self.app_source_id.as_str())
    }

    fn advance_last_processed(
        &self,
        kind: MetricKind,
        checkpoint: &Checkpoint,
        newest: DateTime<Utc>,
    ) -> Result<()> {
        let next = checkpoint.last_processed.max(Some(newest));
        if next != checkpoint.last_processed {
            if let Some(date) = next {
                self.db
                    .save_last_processed(kind, date)
                    .map_err(SyncError::storage)?;
            }
        }
        Ok(())
    }
}

/// Scale percent-encoded values and order by date. Samples whose value is
/// not a finite number are split off; only their dates are returned.
fn normalize_batch(
    kind: MetricKind,
    samples: Vec<RawSample>,
    percent_encoded: bool,
) -> (Vec<RawSample>, Vec<DateTime<Utc>>) {
    let mut out = Vec::with_capacity(samples.len());
    let mut rejected = Vec::new();
    for s in samples {
        let value = normalize(s.value, percent_encoded);
        if !value.is_finite() {
            tracing::warn!(kind = %kind, date = %s.date, value = s.value, "Skipping non-finite sample");
            rejected.push(s.date);
            continue;
        }
        out.push(RawSample { value, ..s });
    }
    out.sort_by_key(|s| s.date);
    (out, rejected)
}
