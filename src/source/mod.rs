pub mod file;
pub mod memory;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::models::checkpoint::AnchorToken;
use crate::models::metric::{MetricKind, RawReading, RawSample};

/// Result of one incremental fetch.
#[derive(Debug, Clone, Default)]
pub struct IncrementalBatch {
    pub samples: Vec<RawSample>,
    /// Cursor to resume from next time, if the source supports one.
    pub new_anchor: Option<AnchorToken>,
}

/// "Something changed for this kind, go refetch." Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: MetricKind,
}

/// Keeps a watch registered. Dropping it stops delivery.
#[derive(Debug)]
pub struct WatchHandle {
    kind: MetricKind,
    active: Arc<AtomicBool>,
}

/// The source-side half of a [`WatchHandle`].
#[derive(Debug, Clone)]
pub struct WatchToken {
    active: Arc<AtomicBool>,
}

impl WatchHandle {
    pub fn new(kind: MetricKind) -> (Self, WatchToken) {
        let active = Arc::new(AtomicBool::new(true));
        let token = WatchToken {
            active: Arc::clone(&active),
        };
        (Self { kind, active }, token)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl WatchToken {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Narrow contract with the external health-data store.
///
/// `unit` is always the kind's canonical unit; percent-encoded kinds come
/// back as unit-interval fractions and are scaled by the caller.
pub trait HealthSource: Send + Sync {
    /// Ask for read/write access to `kinds`. `Ok(false)` means denied.
    fn request_authorization(&self, kinds: &[MetricKind]) -> Result<bool>;

    fn fetch_latest(&self, kind: MetricKind, unit: &str) -> Result<Option<RawReading>>;

    /// Samples after `anchor` when given, else strictly after `since` when
    /// given, else everything.
    fn fetch_incremental_batch(
        &self,
        kind: MetricKind,
        unit: &str,
        anchor: Option<&AnchorToken>,
        since: Option<DateTime<Utc>>,
    ) -> Result<IncrementalBatch>;

    fn save(&self, kind: MetricKind, unit: &str, value: f64, date: DateTime<Utc>) -> Result<()>;

    /// Remove samples with `from <= date <= to`. Returns the number removed.
    fn delete(&self, kind: MetricKind, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize>;

    /// Deliver a [`WatchEvent`] on `events` whenever data for `kind` changes,
    /// for as long as the returned handle lives.
    fn watch(&self, kind: MetricKind, events: Sender<WatchEvent>) -> Result<WatchHandle>;
}

/// Anchor encoding shared by the bundled adapters: a big-endian sequence number.
pub(crate) fn encode_seq(seq: u64) -> AnchorToken {
    AnchorToken(seq.to_be_bytes().to_vec())
}

pub(crate) fn decode_seq(anchor: &AnchorToken) -> Result<u64> {
    let bytes: [u8; 8] = anchor
        .as_bytes()
        .try_into()
        .map_err(|_| anyhow::anyhow!("malformed anchor ({} bytes)", anchor.as_bytes().len()))?;
    Ok(u64::from_be_bytes(bytes))
}
