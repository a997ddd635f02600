pub mod config;
pub mod delete;
pub mod init;
pub mod latest;
pub mod record;
pub mod show;
pub mod status;
pub mod sync;
pub mod watch;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use vitalsync::core::service::SyncService;
use vitalsync::db::Database;
use vitalsync::models::config::Config;
use vitalsync::models::metric::MetricKind;
use vitalsync::source::HealthSource;
use vitalsync::source::file::FileSource;

pub fn open_source(config: &Config) -> Arc<dyn HealthSource> {
    Arc::new(FileSource::new(
        config.source_path(),
        &config.sync.app_source_id,
        Duration::from_millis(config.sync.watch_poll_ms),
    ))
}

pub fn open_service(config: &Config) -> Result<SyncService> {
    let db = Database::open(&Config::db_path())?;
    Ok(SyncService::from_config(config, db, open_source(config))?)
}

pub fn parse_kind(input: &str) -> Result<MetricKind> {
    input.parse()
}
