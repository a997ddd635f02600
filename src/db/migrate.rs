use anyhow::Result;
use rusqlite::Connection;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS samples (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL,
            value       REAL NOT NULL,
            date        TEXT NOT NULL,
            source_id   TEXT,
            imported_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_samples_kind_date ON samples(kind, date);

        CREATE TABLE IF NOT EXISTS checkpoints (
            kind           TEXT PRIMARY KEY,
            anchor         BLOB,
            last_processed TEXT
        );

        CREATE TABLE IF NOT EXISTS sync_state (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}
