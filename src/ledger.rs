use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;

use crate::models::{self, EventBatch};

/// Durable record of announced events: one row per identifier plus its start
/// time. The full table is scanned once when the ledger is opened and that
/// snapshot backs both `seen_ids` and `prune_expired`, consistent with the
/// single `now` captured per run.
pub struct Ledger {
    conn: Connection,
    now: DateTime<Utc>,
    rows: Vec<LedgerRow>,
}

struct LedgerRow {
    id: String,
    start: String,
}

impl Ledger {
    pub fn open<P: AsRef<Path>>(path: P, now: DateTime<Utc>) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS announcements(
                id TEXT PRIMARY KEY,
                start TEXT NOT NULL
            );",
        )?;
        let rows = scan(&conn)?;
        Ok(Self { conn, now, rows })
    }

    /// Identifiers announced by previous runs, as of opening the ledger.
    /// Writes made later in the same run are deliberately not reflected.
    pub fn seen_ids(&self) -> HashSet<String> {
        self.rows.iter().map(|row| row.id.clone()).collect()
    }

    /// Upserts one row per event. Re-recording an identifier overwrites its
    /// start time, so there is never more than one row per identifier.
    pub fn record(&self, events: &EventBatch) -> rusqlite::Result<()> {
        for (id, event) in events {
            self.conn.execute(
                "INSERT INTO announcements (id, start) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET start = excluded.start",
                params![id, models::format_timestamp(&event.started_at)],
            )?;
        }
        Ok(())
    }

    /// Deletes every snapshot row whose start time is at or before this
    /// run's `now`. Returns the number of rows actually deleted; deleting an
    /// already-absent row is a no-op.
    pub fn prune_expired(&self) -> rusqlite::Result<usize> {
        let mut pruned = 0;
        for row in &self.rows {
            let start = match models::parse_timestamp(&row.start) {
                Ok(start) => start,
                Err(err) => {
                    warn!(id = %row.id, error = %err, "ledger row has unreadable start time, leaving it");
                    continue;
                }
            };
            if start <= self.now {
                pruned += self
                    .conn
                    .execute("DELETE FROM announcements WHERE id = ?1", params![row.id])?;
            }
        }
        Ok(pruned)
    }
}

fn scan(conn: &Connection) -> rusqlite::Result<Vec<LedgerRow>> {
    let mut stmt = conn.prepare("SELECT id, start FROM announcements")?;
    let rows = stmt.query_map([], |row| {
        Ok(LedgerRow {
            id: row.get(0)?,
            start: row.get(1)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
