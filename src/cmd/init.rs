use anyhow::Result;
use serde_json::json;

use vitalsync::db::Database;
use vitalsync::models::config::Config;
use vitalsync::output;

pub fn run(force: bool) -> Result<()> {
    let path = Config::path();
    let created = force || !path.exists();
    if created {
        Config::default().save()?;
    }
    Database::open(&Config::db_path())?;

    let out = output::success(
        "init",
        json!({
            "config": path.display().to_string(),
            "created": created,
            "message": if created { "Config initialized" } else { "Config already present" },
        }),
    );
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
