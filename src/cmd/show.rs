use anyhow::Result;
use serde_json::json;

use vitalsync::db::Database;
use vitalsync::models::config::Config;
use vitalsync::output;
use vitalsync::output::human;

pub fn run(kind: &str, last: u32, human_flag: bool) -> Result<()> {
    let config = Config::load()?;
    let kind = super::parse_kind(kind)?;
    let db = Database::open(&Config::db_path())?;
    let samples = db.recent_samples(kind, last)?;

    if human_flag {
        if samples.is_empty() {
            println!("No {} samples stored.", kind);
        }
        for s in &samples {
            println!("{}", human::format_sample(s, &config.units));
        }
    } else {
        let out = output::success("show", json!({ "kind": kind, "entries": samples }));
        println!("{}", serde_json::to_string(&out)?);
    }
    Ok(())
}
