use anyhow::Result;
use serde_json::json;

use vitalsync::core::dedup::DedupPolicy;
use vitalsync::models::config::{Config, Units};
use vitalsync::models::metric::MetricKind;
use vitalsync::output;

pub fn run_show(human: bool) -> Result<()> {
    let config = Config::load()?;
    if human {
        let toml_str = toml::to_string_pretty(&config)?;
        println!("{}", toml_str);
    } else {
        let out = output::success("config", json!({ "config": config }));
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}

fn parse_kinds(value: &str) -> Result<Vec<MetricKind>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    match key {
        "units.system" => match value {
            "metric" => config.units = Units::default(),
            "imperial" => config.units = Units::imperial(),
            _ => anyhow::bail!("units.system must be 'metric' or 'imperial'"),
        },
        "sync.app_source_id" => config.sync.app_source_id = value.to_string(),
        "sync.enabled" => config.sync.enabled = parse_kinds(value)?,
        "sync.backfill_kinds" => config.sync.backfill_kinds = parse_kinds(value)?,
        "sync.date_tolerance_secs" => config.sync.date_tolerance_secs = value.parse()?,
        "sync.cache_ttl_secs" => config.sync.cache_ttl_secs = value.parse()?,
        "sync.watch_poll_ms" => config.sync.watch_poll_ms = value.parse()?,
        "sync.source_path" => config.sync.source_path = Some(value.into()),
        "logging.level" => config.logging.level = value.to_string(),
        k if k.starts_with("tolerance.") => {
            let kind: MetricKind = k.trim_start_matches("tolerance.").parse()?;
            config
                .sync
                .value_tolerance
                .insert(kind.as_str().to_string(), value.parse()?);
        }
        _ => anyhow::bail!("unknown config key: {}", key),
    }

    // Reject settings the sync engine would refuse at startup.
    DedupPolicy::from_config(&config.sync)?;
    config.sync.cache_ttl()?;

    config.save()?;
    let out = output::success("config", json!({ "key": key, "value": value }));
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
