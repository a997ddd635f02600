use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SyncError;
use crate::models::metric::MetricKind;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Units {
    #[serde(default = "default_system")]
    pub system: String,
}

fn default_system() -> String {
    "metric".to_string()
}

impl Default for Units {
    fn default() -> Self {
        Self {
            system: default_system(),
        }
    }
}

impl Units {
    pub fn imperial() -> Self {
        Self {
            system: "imperial".to_string(),
        }
    }

    pub fn is_imperial(&self) -> bool {
        self.system == "imperial"
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Source identifier stamped on this app's own writes.
    #[serde(default = "default_app_source_id")]
    pub app_source_id: String,
    #[serde(default = "default_kinds")]
    pub enabled: Vec<MetricKind>,
    #[serde(default = "default_kinds")]
    pub backfill_kinds: Vec<MetricKind>,
    #[serde(default = "default_date_tolerance_secs")]
    pub date_tolerance_secs: i64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default = "default_watch_poll_ms")]
    pub watch_poll_ms: u64,
    /// Overrides of the per-kind value tolerance policy table, keyed by
    /// kind name.
    #[serde(default)]
    pub value_tolerance: BTreeMap<String, f64>,
}

fn default_app_source_id() -> String {
    "vitalsync".to_string()
}
fn default_kinds() -> Vec<MetricKind> {
    MetricKind::ALL.to_vec()
}
fn default_date_tolerance_secs() -> i64 {
    60
}
fn default_cache_ttl_secs() -> u64 {
    30 * 60
}
fn default_watch_poll_ms() -> u64 {
    1000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            app_source_id: default_app_source_id(),
            enabled: default_kinds(),
            backfill_kinds: default_kinds(),
            date_tolerance_secs: default_date_tolerance_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            source_path: None,
            watch_poll_ms: default_watch_poll_ms(),
            value_tolerance: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    /// Read-cache lifetime. Rejects values chrono cannot represent.
    pub fn cache_ttl(&self) -> Result<chrono::Duration, SyncError> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                SyncError::Config(format!("cache_ttl_secs out of range: {}", self.cache_ttl_secs))
            })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from the standard path, or return defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the standard path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let contents = toml::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::fs::{self, OpenOptions};
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true).mode(0o600);
            let mut file = options.open(&path)?;

            file.write_all(contents.as_bytes())?;

            // The mode passed to open() only applies to newly created files.
            let mut perms = file.metadata()?.permissions();
            if perms.mode() & 0o777 != 0o600 {
                perms.set_mode(0o600);
                fs::set_permissions(&path, perms)?;
            }
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&path, contents)?;
        }

        Ok(())
    }

    pub fn data_dir() -> PathBuf {
        if let Ok(home) = std::env::var("VITALSYNC_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .expect("cannot resolve home directory")
            .join(".vitalsync")
    }

    pub fn path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    pub fn db_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    pub fn log_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Location of the file-backed health store.
    pub fn source_path(&self) -> PathBuf {
        self.sync
            .source_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("health_store.jsonl"))
    }
}
