use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::models::config::Config;
use crate::models::metric::MetricKind;

#[derive(Debug, Serialize)]
pub struct StatusData {
    pub backfill_complete: bool,
    pub last_import_at: Option<DateTime<Utc>>,
    pub kinds: Vec<KindStatus>,
}

#[derive(Debug, Serialize)]
pub struct KindStatus {
    pub kind: MetricKind,
    pub enabled: bool,
    pub samples: u64,
    pub latest_value: Option<f64>,
    pub latest_date: Option<DateTime<Utc>>,
    pub has_anchor: bool,
    pub last_processed: Option<DateTime<Utc>>,
}

/// Summarize sync progress from local storage only; never queries the source.
pub fn compute(db: &Database, config: &Config) -> Result<StatusData> {
    let mut kinds = Vec::new();
    for kind in MetricKind::ALL {
        let checkpoint = db.load_checkpoint(kind)?;
        let latest = db.latest_sample(kind)?;
        kinds.push(KindStatus {
            kind,
            enabled: config.sync.enabled.contains(&kind),
            samples: db.count_samples(kind)?,
            latest_value: latest.as_ref().map(|s| s.value),
            latest_date: latest.as_ref().map(|s| s.date),
            has_anchor: checkpoint.anchor.is_some(),
            last_processed: checkpoint.last_processed,
        });
    }

    Ok(StatusData {
        backfill_complete: db.backfill_complete()?,
        last_import_at: db.last_import_at()?,
        kinds,
    })
}
