#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vitalsync::core::cache::Clock;
use vitalsync::core::dedup::DedupPolicy;
use vitalsync::core::import::{ImportEngine, ImportNotifier};
use vitalsync::db::Database;
use vitalsync::models::metric::MetricKind;
use vitalsync::source::memory::InMemorySource;

pub const APP_SOURCE: &str = "vitalsync";
pub const OTHER_SOURCE: &str = "com.example.scale";

/// Create a temporary database for testing.
pub fn setup_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    (dir, db)
}

/// Fixed reference instant all test dates are offset from.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub fn secs(n: i64) -> Duration {
    Duration::seconds(n)
}

pub fn source() -> Arc<InMemorySource> {
    Arc::new(InMemorySource::new(APP_SOURCE))
}

/// Engine over an in-memory database with the default policy.
pub fn engine(source: &Arc<InMemorySource>) -> ImportEngine {
    vitalsync::logging::init_test();
    let db = Database::open_in_memory().unwrap();
    ImportEngine::new(db, source.clone(), DedupPolicy::default(), APP_SOURCE)
}

/// Notifier that remembers every notice it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub notices: Arc<Mutex<Vec<(MetricKind, DateTime<Utc>)>>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<(MetricKind, DateTime<Utc>)> {
        self.notices.lock().unwrap().clone()
    }
}

impl ImportNotifier for RecordingNotifier {
    fn sample_imported(&self, kind: MetricKind, date: DateTime<Utc>) {
        self.notices.lock().unwrap().push((kind, date));
    }
}

/// Engine wired to a [`RecordingNotifier`].
pub fn engine_with_notices(source: &Arc<InMemorySource>) -> (ImportEngine, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let engine = engine(source).with_notifier(Box::new(notifier.clone()));
    (engine, notifier)
}

/// Clock the test moves by hand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
