use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};

use crate::models::metric::{MetricKind, Sample};

use super::Database;

/// Fixed-width UTC timestamps so that text comparison in SQL matches
/// chronological order.
pub(crate) fn encode_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_date(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

struct SampleRow {
    id: String,
    kind: String,
    value: f64,
    date: String,
    source_id: Option<String>,
}

fn row_to_sample(r: SampleRow) -> Result<Sample> {
    Ok(Sample {
        id: r.id,
        kind: r.kind.parse()?,
        value: r.value,
        date: decode_date(&r.date)?,
        source_id: r.source_id,
    })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SampleRow> {
    Ok(SampleRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        value: row.get(2)?,
        date: row.get(3)?,
        source_id: row.get(4)?,
    })
}

impl Database {
    pub fn insert_sample(&self, s: &Sample) -> Result<()> {
        self.conn.execute(
            "INSERT INTO samples (id, kind, value, date, source_id, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                s.id,
                s.kind.as_str(),
                s.value,
                encode_date(&s.date),
                s.source_id,
                encode_date(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Samples of `kind` with `from <= date <= to`, oldest first.
    pub fn samples_in_window(
        &self,
        kind: MetricKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, value, date, source_id
             FROM samples WHERE kind = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date",
        )?;
        let rows = stmt.query_map(
            params![kind.as_str(), encode_date(&from), encode_date(&to)],
            read_row,
        )?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row_to_sample(row?)?);
        }
        Ok(samples)
    }

    /// Most recent samples of `kind`, newest first.
    pub fn recent_samples(&self, kind: MetricKind, limit: u32) -> Result<Vec<Sample>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, value, date, source_id
             FROM samples WHERE kind = ?1 ORDER BY date DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![kind.as_str(), limit as i64], read_row)?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row_to_sample(row?)?);
        }
        Ok(samples)
    }

    pub fn latest_sample(&self, kind: MetricKind) -> Result<Option<Sample>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, value, date, source_id
                 FROM samples WHERE kind = ?1 ORDER BY date DESC LIMIT 1",
                params![kind.as_str()],
                read_row,
            )
            .optional()?;
        row.map(row_to_sample).transpose()
    }

    pub fn count_samples(&self, kind: MetricKind) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM samples WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Remove samples of `kind` with `from <= date <= to`. Returns the number removed.
    pub fn delete_samples(
        &self,
        kind: MetricKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM samples WHERE kind = ?1 AND date >= ?2 AND date <= ?3",
            params![kind.as_str(), encode_date(&from), encode_date(&to)],
        )?;
        Ok(removed)
    }
}
