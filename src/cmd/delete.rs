use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;

use vitalsync::models::config::Config;
use vitalsync::output;

pub fn run(kind: &str, from: NaiveDate, to: NaiveDate, human_flag: bool) -> Result<()> {
    if to < from {
        anyhow::bail!("--to ({}) is before --from ({})", to, from);
    }
    let config = Config::load()?;
    let kind = super::parse_kind(kind)?;

    let start = Utc.from_utc_datetime(&from.and_time(NaiveTime::MIN));
    let end = Utc.from_utc_datetime(&to.and_time(NaiveTime::MIN)) + Duration::days(1)
        - Duration::milliseconds(1);

    let mut service = super::open_service(&config)?;
    let outcome = service.delete_samples(kind, start, end)?;

    if human_flag {
        println!(
            "Deleted {} {} sample(s) from the health store, {} locally.",
            outcome.removed_from_source, kind, outcome.removed_locally
        );
    } else {
        let out = output::success("delete", json!({ "kind": kind, "outcome": outcome }));
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
