use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, SyncError};
use crate::models::metric::{MetricKind, normalize};
use crate::source::HealthSource;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Latest reading in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatestValue {
    pub value: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: Option<LatestValue>,
    fetched_at: DateTime<Utc>,
}

/// TTL cache of the latest value per kind. Entries are only refreshed on
/// read and never evicted.
pub struct ReadCache {
    source: Arc<dyn HealthSource>,
    ttl: Duration,
    clock: Box<dyn Clock>,
    entries: Mutex<HashMap<MetricKind, CacheEntry>>,
}

impl ReadCache {
    pub fn new(source: Arc<dyn HealthSource>, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Box::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn HealthSource>, ttl: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            source,
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached latest value for `kind`, querying the source when the entry is
    /// missing, empty, stale, or `force_refresh` is set. A failed query
    /// leaves the existing entry untouched.
    pub fn get(&self, kind: MetricKind, force_refresh: bool) -> Result<Option<LatestValue>> {
        let now = self.clock.now();

        if !force_refresh {
            if let Some(CacheEntry {
                value: Some(value),
                fetched_at,
            }) = self.entry(kind)
            {
                if now - fetched_at < self.ttl {
                    tracing::trace!(kind = %kind, "Latest value served from cache");
                    return Ok(Some(value));
                }
            }
        }

        // The lock is not held across the source query.
        let reading = self
            .source
            .fetch_latest(kind, kind.canonical_unit())
            .map_err(|e| SyncError::fetch(kind, e))?;
        let value = reading.map(|r| LatestValue {
            value: normalize(r.value, kind.is_percent_encoded()),
            date: r.date,
        });

        self.lock_entries().insert(
            kind,
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
        Ok(value)
    }

    fn entry(&self, kind: MetricKind) -> Option<CacheEntry> {
        self.lock_entries().get(&kind).copied()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<MetricKind, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
