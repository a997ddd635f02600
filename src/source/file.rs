use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, SystemTime};

use super::{HealthSource, IncrementalBatch, WatchEvent, WatchHandle, decode_seq, encode_seq};
use crate::models::checkpoint::AnchorToken;
use crate::models::metric::{MetricKind, RawReading, RawSample};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreRecord {
    seq: u64,
    kind: MetricKind,
    value: f64,
    date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    /// Deleted records stay behind as tombstones so their `seq` is never
    /// handed out again.
    #[serde(default, skip_serializing_if = "is_false")]
    deleted: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// File-backed [`HealthSource`] over a JSON-lines health store, one
/// `{"seq","kind","value","date","source_id"}` record per line. `seq` never
/// decreases and doubles as the anchor.
pub struct FileSource {
    path: PathBuf,
    app_source_id: String,
    poll_interval: Duration,
    // Serializes read-modify-write cycles from this process.
    write_lock: Mutex<()>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, app_source_id: &str, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            app_source_id: app_source_id.to_string(),
            poll_interval,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_records(&self) -> Result<Vec<StoreRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut records = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: StoreRecord = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: malformed record", self.path.display(), lineno + 1))?;
            records.push(record);
        }
        Ok(records)
    }

    fn write_records(&self, records: &[StoreRecord]) -> Result<()> {
        let mut out = String::new();
        for r in records {
            out.push_str(&serde_json::to_string(r)?);
            out.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, out)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Append a record with the next sequence number.
    pub fn append(
        &self,
        kind: MetricKind,
        value: f64,
        date: DateTime<Utc>,
        source_id: Option<&str>,
    ) -> Result<()> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next_seq = self.read_records()?.iter().map(|r| r.seq).max().unwrap_or(0) + 1;
        let record = StoreRecord {
            seq: next_seq,
            kind,
            value,
            date,
            source_id: source_id.map(str::to_string),
            deleted: false,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
        Ok(())
    }
}

fn file_fingerprint(path: &Path) -> Option<(SystemTime, u64)> {
    let meta = fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

impl HealthSource for FileSource {
    fn request_authorization(&self, _kinds: &[MetricKind]) -> Result<bool> {
        // Access to a local file is granted when it can be read.
        match self.read_records() {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Health store unreadable");
                Ok(false)
            }
        }
    }

    fn fetch_latest(&self, kind: MetricKind, _unit: &str) -> Result<Option<RawReading>> {
        Ok(self
            .read_records()?
            .into_iter()
            .filter(|r| r.kind == kind && !r.deleted)
            .max_by_key(|r| r.date)
            .map(|r| RawReading {
                value: r.value,
                date: r.date,
            }))
    }

    fn fetch_incremental_batch(
        &self,
        kind: MetricKind,
        _unit: &str,
        anchor: Option<&AnchorToken>,
        since: Option<DateTime<Utc>>,
    ) -> Result<IncrementalBatch> {
        let after_seq = anchor.map(decode_seq).transpose()?;
        let records: Vec<StoreRecord> = self
            .read_records()?
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect();

        let newest_seq = records.iter().map(|r| r.seq).max();
        let samples = records
            .into_iter()
            .filter(|r| !r.deleted)
            .filter(|r| match (after_seq, since) {
                (Some(seq), _) => r.seq > seq,
                (None, Some(since)) => r.date > since,
                (None, None) => true,
            })
            .map(|r| RawSample {
                value: r.value,
                date: r.date,
                source_id: r.source_id,
            })
            .collect();

        Ok(IncrementalBatch {
            samples,
            new_anchor: newest_seq.max(after_seq).map(encode_seq),
        })
    }

    fn save(&self, kind: MetricKind, _unit: &str, value: f64, date: DateTime<Utc>) -> Result<()> {
        self.append(kind, value, date, Some(&self.app_source_id))
    }

    fn delete(&self, kind: MetricKind, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize> {
        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut records = self.read_records()?;
        let mut removed = 0;
        for r in records
            .iter_mut()
            .filter(|r| !r.deleted && r.kind == kind && r.date >= from && r.date <= to)
        {
            r.deleted = true;
            removed += 1;
        }
        if removed > 0 {
            self.write_records(&records)?;
        }
        Ok(removed)
    }

    fn watch(&self, kind: MetricKind, events: Sender<WatchEvent>) -> Result<WatchHandle> {
        let (handle, token) = WatchHandle::new(kind);
        let path = self.path.clone();
        let interval = self.poll_interval;

        thread::Builder::new()
            .name(format!("vitalsync-watch-{}", kind))
            .spawn(move || {
                let mut last = file_fingerprint(&path);
                while token.is_active() {
                    thread::sleep(interval);
                    let current = file_fingerprint(&path);
                    if current != last {
                        last = current;
                        if !token.is_active() || events.send(WatchEvent { kind }).is_err() {
                            break;
                        }
                    }
                }
                tracing::debug!(kind = %kind, "Watch thread stopped");
            })
            .context("failed to spawn watch thread")?;

        Ok(handle)
    }
}
