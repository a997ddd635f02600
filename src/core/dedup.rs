use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::error::SyncError;
use crate::models::config::SyncConfig;
use crate::models::metric::MetricKind;

/// Absorbs float representation error in value comparisons.
const VALUE_EPSILON: f64 = 1e-9;

/// Default value tolerance per kind, in canonical units.
pub fn default_value_tolerance(kind: MetricKind) -> f64 {
    match kind {
        MetricKind::Weight | MetricKind::LeanMass => 0.02,
        MetricKind::BodyFat => 0.1,
        MetricKind::Height => 0.5,
        MetricKind::Waist => 0.1,
    }
}

/// Tolerances deciding when two samples are the same measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupPolicy {
    date_tolerance: Duration,
    value_tolerance: BTreeMap<MetricKind, f64>,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            date_tolerance: Duration::seconds(60),
            value_tolerance: MetricKind::ALL
                .iter()
                .map(|&k| (k, default_value_tolerance(k)))
                .collect(),
        }
    }
}

impl DedupPolicy {
    /// Policy from the `[sync]` config section, applying per-kind overrides.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let tolerance = Duration::try_seconds(config.date_tolerance_secs).ok_or_else(|| {
            SyncError::Config(format!(
                "date tolerance out of range: {}s",
                config.date_tolerance_secs
            ))
        })?;
        let mut policy = Self::default().with_date_tolerance(tolerance)?;
        for (name, &tol) in &config.value_tolerance {
            let kind: MetricKind = name
                .parse()
                .map_err(|e: anyhow::Error| SyncError::Config(e.to_string()))?;
            policy = policy.with_value_tolerance(kind, tol)?;
        }
        Ok(policy)
    }

    /// Replace the date tolerance. Bucket width follows it; sub-second
    /// precision is not supported.
    pub fn with_date_tolerance(mut self, tolerance: Duration) -> Result<Self, SyncError> {
        if tolerance.num_seconds() < 1 {
            return Err(SyncError::Config(format!(
                "date tolerance must be at least one second, got {}ms",
                tolerance.num_milliseconds()
            )));
        }
        self.date_tolerance = Duration::seconds(tolerance.num_seconds());
        Ok(self)
    }

    pub fn with_value_tolerance(mut self, kind: MetricKind, tolerance: f64) -> Result<Self, SyncError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SyncError::Config(format!(
                "value tolerance for {} must be a non-negative number, got {}",
                kind, tolerance
            )));
        }
        self.value_tolerance.insert(kind, tolerance);
        Ok(self)
    }

    pub fn date_tolerance(&self) -> Duration {
        self.date_tolerance
    }

    pub fn bucket_secs(&self) -> i64 {
        self.date_tolerance.num_seconds()
    }

    pub fn value_tolerance(&self, kind: MetricKind) -> f64 {
        self.value_tolerance
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_value_tolerance(kind))
    }
}

pub fn bucket_for(date: &DateTime<Utc>, bucket_secs: i64) -> i64 {
    date.timestamp().div_euclid(bucket_secs)
}

/// Time-bucketed index over one kind's samples, built fresh for each import
/// pass. Bucket width equals the date tolerance, so a lookup scans only the
/// neighbouring buckets.
#[derive(Debug)]
pub struct DedupIndex {
    date_tolerance: Duration,
    bucket_secs: i64,
    buckets: HashMap<i64, Vec<(DateTime<Utc>, f64)>>,
}

impl DedupIndex {
    pub fn new(date_tolerance: Duration) -> Self {
        Self {
            date_tolerance,
            bucket_secs: date_tolerance.num_seconds().max(1),
            buckets: HashMap::new(),
        }
    }

    pub fn from_entries(
        date_tolerance: Duration,
        entries: impl IntoIterator<Item = (DateTime<Utc>, f64)>,
    ) -> Self {
        let mut index = Self::new(date_tolerance);
        for (date, value) in entries {
            index.insert(date, value);
        }
        index
    }

    pub fn bucket(&self, date: &DateTime<Utc>) -> i64 {
        bucket_for(date, self.bucket_secs)
    }

    pub fn insert(&mut self, date: DateTime<Utc>, value: f64) {
        let bucket = self.bucket(&date);
        self.buckets.entry(bucket).or_default().push((date, value));
    }

    /// True when an indexed entry lies within the date tolerance AND within
    /// `value_tolerance` of the candidate. Stops at the first match.
    pub fn is_duplicate(&self, date: &DateTime<Utc>, value: f64, value_tolerance: f64) -> bool {
        let bucket = self.bucket(date);
        (bucket - 1..=bucket + 1)
            .filter_map(|b| self.buckets.get(&b))
            .flatten()
            .any(|(existing_date, existing_value)| {
                (*date - *existing_date).abs() <= self.date_tolerance
                    && (value - existing_value).abs() <= value_tolerance + VALUE_EPSILON
            })
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
