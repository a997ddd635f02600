use chrono::{TimeZone, Utc};
use serde_json::json;
use vitalsync::core::backfill::BackfillOutcome;
use vitalsync::core::cache::LatestValue;
use vitalsync::core::import::ImportOutcome;
use vitalsync::core::status::{KindStatus, StatusData};
use vitalsync::error::SyncError;
use vitalsync::models::config::Units;
use vitalsync::models::metric::{MetricKind, Sample};
use vitalsync::output::human::{
    format_backfill, format_import, format_latest, format_sample, format_status,
};
use vitalsync::output::{error, error_from, success};

// ─── envelopes ────────────────────────────────────────────────────────────────

/// success() produces a well-formed JSON envelope with status "ok".
#[test]
fn test_success_envelope_structure() {
    let data = json!({"value": 42});
    let result = success("sync", data.clone());

    assert_eq!(result["status"], "ok");
    assert_eq!(result["command"], "sync");
    assert_eq!(result["data"], data);
    assert!(result["error"].is_null());
}

/// error() produces a well-formed JSON envelope with status "error".
#[test]
fn test_error_envelope_structure() {
    let result = error("latest", "source_error", "store offline");

    assert_eq!(result["status"], "error");
    assert_eq!(result["command"], "latest");
    assert!(result["data"].is_null());
    assert_eq!(result["error"]["code"], "source_error");
    assert_eq!(result["error"]["message"], "store offline");
}

/// error_from() uses the sync error code when there is one.
#[test]
fn test_error_from_sync_error_uses_code() {
    let err: anyhow::Error = SyncError::Authorization("denied".to_string()).into();
    let result = error_from("backfill", &err);
    assert_eq!(result["error"]["code"], "authorization_denied");
    assert_eq!(result["error"]["message"], "denied");
}

/// error_from() falls back to a general code for other errors.
#[test]
fn test_error_from_other_error_is_general() {
    let err = anyhow::anyhow!("unknown metric kind: foo");
    let result = error_from("sync", &err);
    assert_eq!(result["error"]["code"], "general_error");
}

// ─── human formatting ─────────────────────────────────────────────────────────

fn at_eight() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

#[test]
fn test_format_sample_with_source() {
    colored::control::set_override(false);
    let s = Sample::new(MetricKind::Weight, 72.4, at_eight()).with_source(Some("scale".into()));
    let line = format_sample(&s, &Units::default());
    assert_eq!(line, "2026-03-01 08:00 | weight = 72.4 kg  (scale)");
}

#[test]
fn test_format_sample_imperial() {
    colored::control::set_override(false);
    let s = Sample::new(MetricKind::Waist, 80.0, at_eight());
    let line = format_sample(&s, &Units::imperial());
    assert!(line.contains("waist = 31.5 in"));
}

#[test]
fn test_format_latest_none() {
    colored::control::set_override(false);
    assert_eq!(
        format_latest(MetricKind::Height, None, &Units::default()),
        "height: no data"
    );
}

#[test]
fn test_format_latest_value() {
    colored::control::set_override(false);
    let latest = LatestValue {
        value: 21.5,
        date: at_eight(),
    };
    let line = format_latest(MetricKind::BodyFat, Some(&latest), &Units::default());
    assert_eq!(line, "body_fat: 21.5 % (as of 2026-03-01 08:00)");
}

#[test]
fn test_format_import_variants() {
    colored::control::set_override(false);
    let fresh = ImportOutcome {
        inserted: true,
        inserted_count: 2,
        duplicate_count: 1,
        invalid_count: 0,
        newest_date: Some(at_eight()),
    };
    assert_eq!(
        format_import(MetricKind::Weight, &fresh),
        "weight: 2 new, 1 duplicate(s) skipped"
    );
    assert_eq!(
        format_import(MetricKind::Weight, &ImportOutcome::default()),
        "weight: up to date"
    );
}

#[test]
fn test_format_backfill_incomplete_lists_failed() {
    colored::control::set_override(false);
    let outcome = BackfillOutcome::Incomplete {
        failed: vec![MetricKind::BodyFat, MetricKind::Waist],
    };
    let text = format_backfill(&outcome);
    assert!(text.contains("body_fat, waist"));
}

#[test]
fn test_backfill_outcome_json_is_tagged() {
    let value = serde_json::to_value(BackfillOutcome::Completed { inserted: 3 }).unwrap();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["inserted"], 3);
}

#[test]
fn test_format_status_table() {
    colored::control::set_override(false);
    let status = StatusData {
        backfill_complete: false,
        last_import_at: None,
        kinds: vec![KindStatus {
            kind: MetricKind::Weight,
            enabled: true,
            samples: 12,
            latest_value: Some(72.4),
            latest_date: Some(at_eight()),
            has_anchor: true,
            last_processed: Some(at_eight()),
        }],
    };
    let text = format_status(&status, &Units::default());
    assert!(text.starts_with("=== vitalsync status ==="));
    assert!(text.contains("Historical backfill: pending"));
    assert!(text.contains("Last import: never"));
    assert!(text.contains("72.4 kg"));
    assert!(text.contains("anchor"));
}
