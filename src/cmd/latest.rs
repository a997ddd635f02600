use anyhow::Result;
use serde_json::json;

use vitalsync::core::units;
use vitalsync::models::config::Config;
use vitalsync::output;
use vitalsync::output::human;

pub fn run(kind: &str, refresh: bool, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let kind = super::parse_kind(kind)?;
    let service = super::open_service(&config)?;
    let latest = service.read_latest_cached(kind, refresh)?;

    if human_flag {
        println!("{}", human::format_latest(kind, latest.as_ref(), &config.units));
    } else {
        let data = match latest {
            Some(l) => {
                let (value, unit) = units::to_display(l.value, kind, &config.units);
                json!({ "kind": kind, "value": value, "unit": unit, "date": l.date })
            }
            None => json!({ "kind": kind, "value": null }),
        };
        let out = output::success("latest", data);
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
