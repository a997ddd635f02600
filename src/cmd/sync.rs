use anyhow::Result;
use serde_json::json;

use vitalsync::models::config::Config;
use vitalsync::output;
use vitalsync::output::human;

pub fn run(kind: Option<&str>, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let mut service = super::open_service(&config)?;

    let kinds = match kind {
        Some(k) => vec![super::parse_kind(k)?],
        None => config.sync.enabled.clone(),
    };

    let mut results = Vec::new();
    let mut failures = 0;
    for kind in kinds {
        match service.trigger_incremental_sync(kind) {
            Ok(outcome) => {
                if human_flag {
                    println!("{}", human::format_import(kind, &outcome));
                }
                results.push(json!({ "kind": kind, "outcome": outcome }));
            }
            Err(e) => {
                failures += 1;
                if human_flag {
                    println!("{}: failed ({})", kind, e);
                }
                results.push(json!({ "kind": kind, "error": e.to_string() }));
            }
        }
    }

    // A single requested kind that failed is an error; across several kinds
    // failures are reported inline and retried next time.
    if kind.is_some() && failures > 0 {
        anyhow::bail!("sync failed: {}", results[0]["error"].as_str().unwrap_or("unknown error"));
    }

    if !human_flag {
        let out = output::success("sync", json!({ "results": results }));
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}

pub fn run_backfill(human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let mut service = super::open_service(&config)?;
    let outcome = service.trigger_backfill_if_needed()?;
    service.stop_observing();

    if human_flag {
        println!("{}", human::format_backfill(&outcome));
    } else {
        let out = output::success("backfill", serde_json::to_value(&outcome)?);
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
