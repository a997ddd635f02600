/// CLI integration tests for vitalsync.
///
/// Each test spawns the compiled binary via the `assert_cmd::cargo_bin_cmd!`
/// macro and sets `VITALSYNC_HOME` to a fresh `TempDir`, so the config,
/// database and file-backed health store all live in the temp dir.
use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

// ── helpers ──────────────────────────────────────────────────────────────────

/// Returns a `Command` with `VITALSYNC_HOME` pointing at `dir`.
fn cmd_in(dir: &TempDir) -> assert_cmd::Command {
    let mut c = cargo_bin_cmd!("vitalsync");
    c.env("VITALSYNC_HOME", dir.path());
    c.env_remove("RUST_LOG");
    c
}

fn init_dir(dir: &TempDir) {
    cmd_in(dir).arg("init").assert().success();
}

/// Parse stdout JSON and return the root `Value`.
fn parse_json(output: &assert_cmd::assert::Assert) -> Value {
    let bytes = output.get_output().stdout.clone();
    serde_json::from_slice(&bytes).expect("stdout is not valid JSON")
}

/// Parse stderr JSON and return the root `Value`.
fn parse_stderr_json(output: &assert_cmd::assert::Assert) -> Value {
    let bytes = output.get_output().stderr.clone();
    serde_json::from_slice(&bytes).expect("stderr is not valid JSON")
}

/// Append a record to the health store as another app would.
fn write_external(dir: &TempDir, seq: u64, kind: &str, value: f64, date: &str) {
    let line = format!(
        "{{\"seq\":{seq},\"kind\":\"{kind}\",\"value\":{value},\"date\":\"{date}\",\"source_id\":\"com.example.scale\"}}\n"
    );
    let path = dir.path().join("health_store.jsonl");
    let mut contents = fs::read_to_string(&path).unwrap_or_default();
    contents.push_str(&line);
    fs::write(&path, contents).unwrap();
}

// ── init ─────────────────────────────────────────────────────────────────────

#[test]
fn test_init_creates_config_and_db() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config initialized"));

    assert!(dir.path().join("config.toml").exists());
    assert!(dir.path().join("data.db").exists());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config already present"));
}

// ── record / sync / show ─────────────────────────────────────────────────────

#[test]
fn test_record_writes_store_and_imports() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);

    let out = cmd_in(&dir)
        .args(["record", "weight", "72.4", "--date", "2026-03-01"])
        .assert()
        .success();
    let json = parse_json(&out);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["data"]["kind"], "weight");
    assert_eq!(json["data"]["value"], 72.4);
    assert_eq!(json["data"]["imported"], true);

    let store = fs::read_to_string(dir.path().join("health_store.jsonl")).unwrap();
    assert!(store.contains("\"source_id\":\"vitalsync\""));

    let out = cmd_in(&dir).args(["show", "weight"]).assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["entries"].as_array().unwrap().len(), 1);
}

#[test]
fn test_record_body_fat_stored_as_fraction() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["record", "body_fat", "21.5", "--date", "2026-03-01"])
        .assert()
        .success();

    let store = fs::read_to_string(dir.path().join("health_store.jsonl")).unwrap();
    assert!(store.contains("\"value\":0.215"));

    let out = cmd_in(&dir).args(["latest", "body_fat"]).assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["value"], 21.5);
    assert_eq!(json["data"]["unit"], "%");
}

#[test]
fn test_sync_imports_external_and_skips_duplicates() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    write_external(&dir, 1, "weight", 72.40, "2026-03-01T08:00:00Z");
    write_external(&dir, 2, "weight", 72.41, "2026-03-01T08:00:10Z");
    write_external(&dir, 3, "weight", 70.10, "2026-03-01T13:00:00Z");

    let out = cmd_in(&dir).args(["sync", "weight"]).assert().success();
    let json = parse_json(&out);
    let outcome = &json["data"]["results"][0]["outcome"];
    assert_eq!(outcome["inserted_count"], 2);
    assert_eq!(outcome["duplicate_count"], 1);

    let out = cmd_in(&dir).args(["sync", "weight"]).assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["results"][0]["outcome"]["inserted"], false);
}

#[test]
fn test_sync_all_enabled_kinds() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    write_external(&dir, 1, "waist", 82.0, "2026-03-01T08:00:00Z");

    let out = cmd_in(&dir).arg("sync").assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["results"].as_array().unwrap().len(), 5);
}

#[test]
fn test_sync_human_output() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    write_external(&dir, 1, "height", 178.0, "2026-03-01T08:00:00Z");
    cmd_in(&dir)
        .args(["sync", "height", "--human"])
        .assert()
        .success()
        .stdout(predicate::str::contains("height:"));
}

// ── backfill / status ────────────────────────────────────────────────────────

#[test]
fn test_backfill_then_already_complete() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    write_external(&dir, 1, "weight", 72.4, "2025-12-01T08:00:00Z");
    write_external(&dir, 2, "lean_mass", 58.0, "2025-12-01T08:00:00Z");

    let out = cmd_in(&dir).arg("backfill").assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["inserted"], 2);

    let out = cmd_in(&dir).arg("backfill").assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["status"], "already_complete");

    let out = cmd_in(&dir).arg("status").assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["backfill_complete"], true);
    let weight = &json["data"]["kinds"][0];
    assert_eq!(weight["kind"], "weight");
    assert_eq!(weight["samples"], 1);
    assert_eq!(weight["has_anchor"], true);
}

#[test]
fn test_backfill_fails_on_corrupt_store() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    fs::write(dir.path().join("health_store.jsonl"), "not json\n").unwrap();

    let out = cmd_in(&dir).arg("backfill").assert().failure();
    let json = parse_stderr_json(&out);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], "authorization_denied");
}

#[test]
fn test_status_human_table() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["status", "--human"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vitalsync status"))
        .stdout(predicate::str::contains("lean_mass"));
}

// ── delete ───────────────────────────────────────────────────────────────────

#[test]
fn test_delete_range() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    write_external(&dir, 1, "weight", 72.4, "2026-03-01T08:00:00Z");
    write_external(&dir, 2, "weight", 72.0, "2026-03-02T08:00:00Z");
    cmd_in(&dir).args(["sync", "weight"]).assert().success();

    let out = cmd_in(&dir)
        .args(["delete", "weight", "--from", "2026-03-01", "--to", "2026-03-01"])
        .assert()
        .success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["outcome"]["removed_from_source"], 1);
    assert_eq!(json["data"]["outcome"]["removed_locally"], 1);
}

#[test]
fn test_delete_rejects_inverted_range() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["delete", "weight", "--from", "2026-03-02", "--to", "2026-03-01"])
        .assert()
        .failure();
}

// ── config ───────────────────────────────────────────────────────────────────

#[test]
fn test_config_set_and_show() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["config", "set", "units.system", "imperial"])
        .assert()
        .success();
    cmd_in(&dir)
        .args(["config", "set", "tolerance.weight", "0.05"])
        .assert()
        .success();

    let out = cmd_in(&dir).args(["config", "show"]).assert().success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["config"]["units"]["system"], "imperial");
    assert_eq!(json["data"]["config"]["sync"]["value_tolerance"]["weight"], 0.05);
}

#[test]
fn test_config_set_rejects_invalid_tolerance() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    let out = cmd_in(&dir)
        .args(["config", "set", "sync.date_tolerance_secs", "0"])
        .assert()
        .failure();
    let json = parse_stderr_json(&out);
    assert_eq!(json["error"]["code"], "config_error");
}

#[test]
fn test_config_set_rejects_out_of_range_durations() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    for (key, value) in [
        ("sync.date_tolerance_secs", "9223372036854775807"),
        ("sync.cache_ttl_secs", "18446744073709551615"),
    ] {
        let out = cmd_in(&dir).args(["config", "set", key, value]).assert().failure();
        let json = parse_stderr_json(&out);
        assert_eq!(json["error"]["code"], "config_error", "{key}");
    }
}

#[test]
fn test_config_set_unknown_key() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["config", "set", "nope", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_imperial_record_converts_to_canonical() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["config", "set", "units.system", "imperial"])
        .assert()
        .success();
    let out = cmd_in(&dir)
        .args(["record", "weight", "160", "--date", "2026-03-01"])
        .assert()
        .success();
    let json = parse_json(&out);
    assert_eq!(json["data"]["unit"], "lbs");
    assert_eq!(json["data"]["value"], 160.0);
}

// ── errors ───────────────────────────────────────────────────────────────────

#[test]
fn test_unknown_kind_is_error_envelope() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    let out = cmd_in(&dir).args(["latest", "steps"]).assert().failure();
    let json = parse_stderr_json(&out);
    assert_eq!(json["status"], "error");
    assert_eq!(json["command"], "latest");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unknown metric kind")
    );
}

#[test]
fn test_negative_value_rejected() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    cmd_in(&dir)
        .args(["record", "waist", "--", "-3"])
        .assert()
        .failure();
}

// ── watch / completions ──────────────────────────────────────────────────────

#[test]
fn test_watch_with_time_limit() {
    let dir = TempDir::new().unwrap();
    init_dir(&dir);
    let out = cmd_in(&dir)
        .args(["watch", "--seconds", "1"])
        .assert()
        .success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).unwrap();
    let last = stdout.lines().last().unwrap();
    let json: Value = serde_json::from_str(last).unwrap();
    assert_eq!(json["command"], "watch");
    assert_eq!(json["data"]["report"]["watched"].as_array().unwrap().len(), 5);
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    cmd_in(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vitalsync"));
}
