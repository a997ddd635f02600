use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard};

use super::{
    HealthSource, IncrementalBatch, WatchEvent, WatchHandle, WatchToken, decode_seq, encode_seq,
};
use crate::models::checkpoint::AnchorToken;
use crate::models::metric::{MetricKind, RawReading, RawSample};

#[derive(Debug, Clone)]
struct Record {
    seq: u64,
    kind: MetricKind,
    sample: RawSample,
}

struct Watcher {
    kind: MetricKind,
    events: Sender<WatchEvent>,
    token: WatchToken,
}

#[derive(Default)]
struct Inner {
    records: Vec<Record>,
    next_seq: u64,
    failing: HashSet<MetricKind>,
    denied: bool,
    watchers: Vec<Watcher>,
    unwatchable: HashSet<MetricKind>,
    latest_fetches: HashMap<MetricKind, usize>,
    batch_fetches: HashMap<MetricKind, usize>,
}

/// Deterministic source for tests and demos. The anchor is the highest
/// sequence number handed out for a kind; every query is counted.
pub struct InMemorySource {
    app_source_id: String,
    anchors: bool,
    inner: Mutex<Inner>,
}

impl InMemorySource {
    /// `app_source_id` is stamped on samples written through [`HealthSource::save`].
    pub fn new(app_source_id: &str) -> Self {
        Self {
            app_source_id: app_source_id.to_string(),
            anchors: true,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A source that never hands out anchors, forcing the date fallback.
    pub fn without_anchors(mut self) -> Self {
        self.anchors = false;
        self
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add a raw sample as if another app had written it, and wake watchers.
    pub fn push(&self, kind: MetricKind, value: f64, date: DateTime<Utc>, source_id: Option<&str>) {
        let mut inner = self.state();
        append(
            &mut inner,
            kind,
            RawSample {
                value,
                date,
                source_id: source_id.map(str::to_string),
            },
        );
    }

    /// Make every fetch for `kind` fail until [`recover`](Self::recover).
    pub fn fail(&self, kind: MetricKind) {
        self.state().failing.insert(kind);
    }

    pub fn recover(&self, kind: MetricKind) {
        self.state().failing.remove(&kind);
    }

    pub fn deny_authorization(&self) {
        self.state().denied = true;
    }

    /// Make [`HealthSource::watch`] fail for `kind`.
    pub fn refuse_watch(&self, kind: MetricKind) {
        self.state().unwatchable.insert(kind);
    }

    pub fn latest_fetch_count(&self, kind: MetricKind) -> usize {
        self.state().latest_fetches.get(&kind).copied().unwrap_or(0)
    }

    pub fn batch_fetch_count(&self, kind: MetricKind) -> usize {
        self.state().batch_fetches.get(&kind).copied().unwrap_or(0)
    }

    pub fn active_watch_count(&self, kind: MetricKind) -> usize {
        self.state()
            .watchers
            .iter()
            .filter(|w| w.kind == kind && w.token.is_active())
            .count()
    }

    pub fn record_count(&self, kind: MetricKind) -> usize {
        self.state().records.iter().filter(|r| r.kind == kind).count()
    }
}

fn append(inner: &mut Inner, kind: MetricKind, sample: RawSample) {
    inner.next_seq += 1;
    let seq = inner.next_seq;
    inner.records.push(Record { seq, kind, sample });

    inner.watchers.retain(|w| w.token.is_active());
    for w in inner.watchers.iter().filter(|w| w.kind == kind) {
        let _ = w.events.send(WatchEvent { kind });
    }
}

impl HealthSource for InMemorySource {
    fn request_authorization(&self, _kinds: &[MetricKind]) -> Result<bool> {
        Ok(!self.state().denied)
    }

    fn fetch_latest(&self, kind: MetricKind, _unit: &str) -> Result<Option<RawReading>> {
        let mut inner = self.state();
        *inner.latest_fetches.entry(kind).or_default() += 1;
        if inner.failing.contains(&kind) {
            anyhow::bail!("source unavailable for {}", kind);
        }
        Ok(inner
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .max_by_key(|r| r.sample.date)
            .map(|r| RawReading {
                value: r.sample.value,
                date: r.sample.date,
            }))
    }

    fn fetch_incremental_batch(
        &self,
        kind: MetricKind,
        _unit: &str,
        anchor: Option<&AnchorToken>,
        since: Option<DateTime<Utc>>,
    ) -> Result<IncrementalBatch> {
        let mut inner = self.state();
        *inner.batch_fetches.entry(kind).or_default() += 1;
        if inner.failing.contains(&kind) {
            anyhow::bail!("source unavailable for {}", kind);
        }

        let after_seq = anchor.map(decode_seq).transpose()?;
        let of_kind = inner.records.iter().filter(|r| r.kind == kind);
        let samples = of_kind
            .clone()
            .filter(|r| match (after_seq, since) {
                (Some(seq), _) => r.seq > seq,
                (None, Some(since)) => r.sample.date > since,
                (None, None) => true,
            })
            .map(|r| r.sample.clone())
            .collect();

        let new_anchor = if self.anchors {
            of_kind.map(|r| r.seq).max().max(after_seq).map(encode_seq)
        } else {
            None
        };

        Ok(IncrementalBatch { samples, new_anchor })
    }

    fn save(&self, kind: MetricKind, _unit: &str, value: f64, date: DateTime<Utc>) -> Result<()> {
        let mut inner = self.state();
        append(
            &mut inner,
            kind,
            RawSample {
                value,
                date,
                source_id: Some(self.app_source_id.clone()),
            },
        );
        Ok(())
    }

    fn delete(&self, kind: MetricKind, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize> {
        let mut inner = self.state();
        if inner.failing.contains(&kind) {
            anyhow::bail!("source unavailable for {}", kind);
        }
        let before = inner.records.len();
        inner
            .records
            .retain(|r| !(r.kind == kind && r.sample.date >= from && r.sample.date <= to));
        Ok(before - inner.records.len())
    }

    fn watch(&self, kind: MetricKind, events: Sender<WatchEvent>) -> Result<WatchHandle> {
        let mut inner = self.state();
        if inner.unwatchable.contains(&kind) {
            anyhow::bail!("observer query rejected for {}", kind);
        }
        let (handle, token) = WatchHandle::new(kind);
        inner.watchers.push(Watcher { kind, events, token });
        Ok(handle)
    }
}
