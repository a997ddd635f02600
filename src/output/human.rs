use colored::Colorize;
use comfy_table::{Table, presets::UTF8_BORDERS_ONLY};

use crate::core::backfill::BackfillOutcome;
use crate::core::cache::LatestValue;
use crate::core::import::ImportOutcome;
use crate::core::status::StatusData;
use crate::core::units;
use crate::models::config::Units;
use crate::models::metric::{MetricKind, Sample};

/// One line per sample, converted to the user's unit system.
pub fn format_sample(s: &Sample, user_units: &Units) -> String {
    let (value, unit) = units::to_display(s.value, s.kind, user_units);
    let mut line = format!("{} | {} = {} {}", s.date.format("%Y-%m-%d %H:%M"), s.kind, value, unit);
    if let Some(ref src) = s.source_id {
        line.push_str(&format!("  ({})", src));
    }
    line
}

pub fn format_latest(kind: MetricKind, latest: Option<&LatestValue>, user_units: &Units) -> String {
    match latest {
        Some(l) => {
            let (value, unit) = units::to_display(l.value, kind, user_units);
            format!(
                "{}: {} {} (as of {})",
                kind,
                value.to_string().bold(),
                unit,
                l.date.format("%Y-%m-%d %H:%M")
            )
        }
        None => format!("{}: {}", kind, "no data".dimmed()),
    }
}

pub fn format_import(kind: MetricKind, outcome: &ImportOutcome) -> String {
    let mut line = format_import_counts(kind, outcome);
    if outcome.invalid_count > 0 {
        line.push_str(&format!(", {} invalid value(s) dropped", outcome.invalid_count));
    }
    line
}

fn format_import_counts(kind: MetricKind, outcome: &ImportOutcome) -> String {
    if outcome.inserted {
        format!(
            "{}: {} new, {} duplicate(s) skipped",
            kind,
            outcome.inserted_count.to_string().green(),
            outcome.duplicate_count
        )
    } else if outcome.duplicate_count > 0 {
        format!("{}: up to date ({} duplicate(s) skipped)", kind, outcome.duplicate_count)
    } else {
        format!("{}: up to date", kind)
    }
}

pub fn format_backfill(outcome: &BackfillOutcome) -> String {
    match outcome {
        BackfillOutcome::AlreadyComplete => "Historical backfill already complete.".to_string(),
        BackfillOutcome::Completed { inserted } => {
            format!("Historical backfill complete: {} sample(s) imported.", inserted)
                .green()
                .to_string()
        }
        BackfillOutcome::Incomplete { failed } => {
            let names: Vec<String> = failed.iter().map(|k| k.to_string()).collect();
            format!(
                "Historical backfill incomplete, will retry. Failed: {}",
                names.join(", ")
            )
            .yellow()
            .to_string()
        }
    }
}

/// Sync status as a table.
pub fn format_status(s: &StatusData, user_units: &Units) -> String {
    let mut out = String::from("=== vitalsync status ===\n\n");
    let backfill = if s.backfill_complete {
        "complete".green()
    } else {
        "pending".yellow()
    };
    out.push_str(&format!("Historical backfill: {}\n", backfill));
    match s.last_import_at {
        Some(at) => out.push_str(&format!("Last import: {}\n\n", at.format("%Y-%m-%d %H:%M:%S"))),
        None => out.push_str("Last import: never\n\n"),
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["kind", "sync", "samples", "latest", "cursor", "last processed"]);
    for k in &s.kinds {
        let latest = match k.latest_value {
            Some(v) => {
                let (value, unit) = units::to_display(v, k.kind, user_units);
                format!("{} {}", value, unit)
            }
            None => "-".to_string(),
        };
        let cursor = if k.has_anchor {
            "anchor"
        } else if k.last_processed.is_some() {
            "date"
        } else {
            "-"
        };
        table.add_row(vec![
            k.kind.to_string(),
            (if k.enabled { "on" } else { "off" }).to_string(),
            k.samples.to_string(),
            latest,
            cursor.to_string(),
            k.last_processed
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    out.push_str(&table.to_string());
    out
}
