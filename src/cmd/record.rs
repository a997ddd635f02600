use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;

use vitalsync::core::record::{RecordEntry, record_measurement};
use vitalsync::core::units;
use vitalsync::models::config::Config;
use vitalsync::output;

pub fn run(kind: &str, value: f64, date: Option<&str>, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let kind = super::parse_kind(kind)?;
    let date = date.map(parse_date).transpose()?;

    let mut service = super::open_service(&config)?;
    let recorded = record_measurement(
        service.engine().source().as_ref(),
        &config,
        RecordEntry { kind, value, date },
    )?;
    // Pull the new sample in right away; failures here are retried later.
    let imported = service.trigger_incremental_sync(kind).ok();

    let (display_value, unit) = units::to_display(recorded.value, kind, &config.units);
    if human_flag {
        println!("Recorded: {} = {} {}", kind, display_value, unit);
    } else {
        let out = output::success(
            "record",
            json!({
                "kind": kind,
                "value": display_value,
                "unit": unit,
                "date": recorded.date,
                "imported": imported.map(|o| o.inserted).unwrap_or(false),
            }),
        );
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}

/// Accept a bare day (noon UTC) or a full RFC 3339 timestamp.
fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(day) = input.parse::<NaiveDate>() {
        if let Some(dt) = day.and_hms_opt(12, 0, 0) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    Ok(DateTime::parse_from_rfc3339(input)
        .map_err(|e| anyhow::anyhow!("invalid date '{}': {}", input, e))?
        .with_timezone(&Utc))
}
