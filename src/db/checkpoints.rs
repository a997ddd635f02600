use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::models::checkpoint::{AnchorToken, Checkpoint};
use crate::models::metric::MetricKind;

use super::Database;
use super::samples::{decode_date, encode_date};

const BACKFILL_COMPLETE_KEY: &str = "historical_backfill_complete";
const LAST_IMPORT_KEY: &str = "last_import_at";

impl Database {
    pub fn load_checkpoint(&self, kind: MetricKind) -> Result<Checkpoint> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT anchor, last_processed FROM checkpoints WHERE kind = ?1",
                params![kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((anchor, last_processed)) = row else {
            return Ok(Checkpoint::default());
        };
        Ok(Checkpoint {
            anchor: anchor.map(AnchorToken),
            last_processed: last_processed.as_deref().map(decode_date).transpose()?,
        })
    }

    pub fn save_anchor(&self, kind: MetricKind, anchor: &AnchorToken) -> Result<()> {
        self.conn.execute(
            "INSERT INTO checkpoints (kind, anchor) VALUES (?1, ?2)
             ON CONFLICT(kind) DO UPDATE SET anchor = excluded.anchor",
            params![kind.as_str(), anchor.as_bytes()],
        )?;
        Ok(())
    }

    pub fn save_last_processed(&self, kind: MetricKind, date: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO checkpoints (kind, last_processed) VALUES (?1, ?2)
             ON CONFLICT(kind) DO UPDATE SET last_processed = excluded.last_processed",
            params![kind.as_str(), encode_date(&date)],
        )?;
        Ok(())
    }

    fn get_state(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM sync_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set_state(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn backfill_complete(&self) -> Result<bool> {
        Ok(self.get_state(BACKFILL_COMPLETE_KEY)?.as_deref() == Some("true"))
    }

    pub fn set_backfill_complete(&self) -> Result<()> {
        self.set_state(BACKFILL_COMPLETE_KEY, "true")
    }

    pub fn last_import_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.get_state(LAST_IMPORT_KEY)?
            .as_deref()
            .map(decode_date)
            .transpose()
    }

    pub fn set_last_import_at(&self, at: DateTime<Utc>) -> Result<()> {
        self.set_state(LAST_IMPORT_KEY, &encode_date(&at))
    }
}
