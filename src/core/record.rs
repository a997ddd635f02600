use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::core::units;
use crate::models::config::Config;
use crate::models::metric::MetricKind;
use crate::source::HealthSource;

/// A measurement entered by the user, in their display unit system.
pub struct RecordEntry {
    pub kind: MetricKind,
    pub value: f64,
    pub date: Option<DateTime<Utc>>,
}

/// What was written to the source, in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Recorded {
    pub kind: MetricKind,
    pub value: f64,
    pub date: DateTime<Utc>,
}

/// Write a user measurement to the source as this app.
///
/// The sample reaches local storage through the next import pass, like any
/// other; it carries this app's source id so it never raises an
/// external-import notice.
pub fn record_measurement(
    source: &dyn HealthSource,
    config: &Config,
    entry: RecordEntry,
) -> Result<Recorded> {
    if !entry.value.is_finite() || entry.value < 0.0 {
        anyhow::bail!("value must be a non-negative number, got {}", entry.value);
    }
    let value = units::from_input(entry.value, entry.kind, &config.units);
    if entry.kind.is_percent_encoded() && value > 100.0 {
        anyhow::bail!("{} must be a percentage between 0 and 100", entry.kind);
    }
    let date = entry.date.unwrap_or_else(Utc::now);

    source.save(
        entry.kind,
        entry.kind.canonical_unit(),
        units::to_source(value, entry.kind),
        date,
    )?;
    tracing::info!(kind = %entry.kind, value, date = %date, "Recorded measurement");

    Ok(Recorded {
        kind: entry.kind,
        value,
        date,
    })
}
