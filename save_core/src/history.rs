//! Durable per-directory history of derived snapshots.
//!
//! Snapshots live in a SQLite file next to the saves, keyed by the save
//! timestamp. Older versions of the tool kept the same records in a flat JSON
//! array; [`SnapshotHistory::migrate_legacy_if_present`] moves those into the
//! database once and removes the flat file when every record is accounted for.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use rusqlite::{params, Connection, OptionalExtension};
use save_proto::{
    decode_snapshot_json, decode_snapshot_list_json, encode_snapshot_json, Snapshot,
    TimelinePoint,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::inspector_config::HistoryConfig;

const HISTORY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp TEXT NOT NULL UNIQUE,
  payload TEXT NOT NULL
);
"#;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to encode snapshot {timestamp}: {source}")]
    Encode {
        timestamp: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored snapshot {timestamp} is unreadable: {source}")]
    Payload {
        timestamp: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read legacy history {path}: {source}")]
    LegacyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("legacy history {path} is malformed: {source}")]
    LegacyFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of a legacy migration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    NoLegacyFile,
    /// All legacy records were stored and the flat file was removed.
    Migrated { entries: usize, stored: usize },
    /// Records were imported but the flat file was kept.
    Retained { reason: String, stored: usize },
    /// The flat file could not be read or parsed; it was kept and the store
    /// was not touched.
    Failed { reason: String },
}

impl HistoryError {
    /// Whether the error came from reading or parsing a legacy flat file,
    /// before the store was modified.
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            HistoryError::LegacyRead { .. } | HistoryError::LegacyFormat { .. }
        )
    }
}

pub struct SnapshotHistory {
    conn: Connection,
    path: PathBuf,
}

impl SnapshotHistory {
    /// Open or create the store that belongs to a save directory.
    pub fn open(directory: &Path, config: &HistoryConfig) -> Result<Self, HistoryError> {
        Self::open_at(config.database_path(directory))
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let conn = Connection::open(&path)?;
        conn.execute_batch(HISTORY_SCHEMA)?;
        debug!(
            target: "save_inspector::history",
            path = %path.display(),
            "history.opened"
        );
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a snapshot unless one with the same timestamp exists.
    ///
    /// Returns whether a new record was written.
    pub fn append(&mut self, snapshot: &Snapshot) -> Result<bool, HistoryError> {
        let inserted = insert_snapshot(&self.conn, snapshot)?;
        if inserted {
            info!(
                target: "save_inspector::history",
                timestamp = %snapshot.timestamp,
                "history.appended"
            );
        } else {
            debug!(
                target: "save_inspector::history",
                timestamp = %snapshot.timestamp,
                "history.duplicate_skipped"
            );
        }
        Ok(inserted)
    }

    /// Every stored snapshot in insertion order.
    pub fn all(&self) -> Result<Vec<Snapshot>, HistoryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT timestamp, payload FROM snapshots ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut snapshots = Vec::new();
        for row in rows {
            let (timestamp, payload) = row?;
            snapshots.push(decode_payload(timestamp, &payload)?);
        }
        Ok(snapshots)
    }

    pub fn latest(&self) -> Result<Option<Snapshot>, HistoryError> {
        let row = self
            .conn
            .query_row(
                "SELECT timestamp, payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(timestamp, payload)| decode_payload(timestamp, &payload))
            .transpose()
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, timestamp: &str) -> Result<bool, HistoryError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM snapshots WHERE timestamp = ?1",
                params![timestamp],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Clean water over time, labelled by weather cycle and day.
    pub fn timeline(&self) -> Result<Vec<TimelinePoint>, HistoryError> {
        Ok(self.all()?.iter().map(Snapshot::timeline_point).collect())
    }

    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.conn.execute("DELETE FROM snapshots", [])?;
        Ok(())
    }

    /// Import a legacy flat-file history if one exists.
    ///
    /// Every entry must parse before the store is touched. The store is then
    /// replaced by the legacy records in one transaction and checked against
    /// the distinct legacy timestamps; the flat file is deleted only when the
    /// check passes. Running this again after a partial failure redoes the
    /// whole import.
    pub fn migrate_legacy_if_present(
        &mut self,
        legacy_path: &Path,
    ) -> Result<MigrationOutcome, HistoryError> {
        if !legacy_path.is_file() {
            return Ok(MigrationOutcome::NoLegacyFile);
        }

        let contents =
            fs::read_to_string(legacy_path).map_err(|source| HistoryError::LegacyRead {
                path: legacy_path.to_path_buf(),
                source,
            })?;
        let entries = decode_snapshot_list_json(contents.trim_start_matches('\u{feff}'))
            .map_err(|source| HistoryError::LegacyFormat {
                path: legacy_path.to_path_buf(),
                source,
            })?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots", [])?;
        for snapshot in &entries {
            insert_snapshot(&tx, snapshot)?;
        }
        tx.commit()?;

        let expected: BTreeSet<&str> = entries.iter().map(|s| s.timestamp.as_str()).collect();
        let stored = self.len()?;
        if let Some(reason) = self.verify_import(&expected)? {
            warn!(
                target: "save_inspector::history",
                path = %legacy_path.display(),
                %reason,
                "history.migration_unverified"
            );
            return Ok(MigrationOutcome::Retained { reason, stored });
        }

        if let Err(err) = fs::remove_file(legacy_path) {
            warn!(
                target: "save_inspector::history",
                path = %legacy_path.display(),
                error = %err,
                "history.legacy_remove_failed"
            );
            return Ok(MigrationOutcome::Retained {
                reason: format!("failed to remove legacy file: {err}"),
                stored,
            });
        }

        info!(
            target: "save_inspector::history",
            path = %legacy_path.display(),
            entries = entries.len(),
            stored,
            "history.migrated"
        );
        Ok(MigrationOutcome::Migrated {
            entries: entries.len(),
            stored,
        })
    }

    /// Describe how the store differs from the expected set of timestamps,
    /// or `None` when it holds exactly those.
    fn verify_import(&self, expected: &BTreeSet<&str>) -> Result<Option<String>, HistoryError> {
        let stored = self.len()?;
        let mut missing = 0;
        for timestamp in expected {
            if !self.contains(timestamp)? {
                missing += 1;
            }
        }
        if stored == expected.len() && missing == 0 {
            return Ok(None);
        }
        Ok(Some(format!(
            "stored {stored} records for {} distinct timestamps ({missing} missing)",
            expected.len()
        )))
    }
}

fn insert_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<bool, HistoryError> {
    let encode_err = |source| HistoryError::Encode {
        timestamp: snapshot.timestamp.clone(),
        source,
    };
    let payload = encode_snapshot_json(snapshot).map_err(encode_err)?;
    // serde_json writes non-finite floats as null; such a payload would make
    // every later read of the store fail.
    decode_snapshot_json(&payload).map_err(encode_err)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO snapshots (timestamp, payload) VALUES (?1, ?2)",
        params![snapshot.timestamp, payload],
    )?;
    Ok(changed > 0)
}

fn decode_payload(timestamp: String, payload: &str) -> Result<Snapshot, HistoryError> {
    decode_snapshot_json(payload).map_err(|source| HistoryError::Payload { timestamp, source })
}
