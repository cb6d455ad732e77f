//! One full processing cycle over a save directory.
//!
//! A cycle reads archives, derives a snapshot from each, records it in the
//! directory's history and reports per-file outcomes. Settings updates run
//! their own read-modify-write cycle against a single archive, serialised per
//! path.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use parking_lot::Mutex;
use save_proto::{Snapshot, SettingsRecord};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    archive::{ArchiveError, ArchiveStore},
    history::{HistoryError, MigrationOutcome, SnapshotHistory},
    inspector_config::InspectorConfig,
    metrics::capture_snapshot,
    settings::{current_settings, SettingsEditor, SettingsError, SettingsUpdate},
    world::WorldError,
};

/// Coarse classification used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Decode,
    Shape,
    Write,
    Settings,
    History,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Decode => "decode",
            ErrorKind::Shape => "shape",
            ErrorKind::Write => "write",
            ErrorKind::Settings => "settings",
            ErrorKind::History => "history",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no save archives found in {}", .0.display())]
    NoSaves(PathBuf),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoSaves(_) => ErrorKind::NotFound,
            SessionError::Archive(err) if err.is_write() => ErrorKind::Write,
            SessionError::Archive(_) => ErrorKind::Decode,
            SessionError::World(err) => world_kind(err),
            SessionError::Settings(SettingsError::World(err)) => world_kind(err),
            SessionError::Settings(_) => ErrorKind::Settings,
            SessionError::History(_) => ErrorKind::History,
        }
    }

    /// Store failures end an ingest cycle; everything else is charged to the
    /// archive being processed.
    fn aborts_cycle(&self) -> bool {
        matches!(
            self,
            SessionError::History(err) if !matches!(err, HistoryError::Encode { .. })
        )
    }
}

fn world_kind(err: &WorldError) -> ErrorKind {
    if err.is_shape() {
        ErrorKind::Shape
    } else {
        ErrorKind::Decode
    }
}

/// Which archives a cycle reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestScope {
    #[default]
    Latest,
    All,
}

#[derive(Debug, Clone)]
pub struct ProcessedSave {
    pub path: PathBuf,
    pub snapshot: Snapshot,
    /// `None` when the save lacks one of the weather-duration singletons.
    pub settings: Option<SettingsRecord>,
    /// False when the history already held this timestamp.
    pub appended: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSave {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Archives considered, oldest first.
    pub files: Vec<PathBuf>,
    pub processed: Vec<ProcessedSave>,
    pub skipped: Vec<SkippedSave>,
    pub migration: Option<MigrationOutcome>,
}

impl IngestReport {
    /// The newest save that was processed successfully.
    pub fn latest(&self) -> Option<&ProcessedSave> {
        self.processed.last()
    }

    pub fn appended(&self) -> usize {
        self.processed.iter().filter(|save| save.appended).count()
    }
}

/// Settings before and after a committed update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsChange {
    pub path: PathBuf,
    pub before: SettingsRecord,
    pub after: SettingsRecord,
}

#[derive(Debug, Clone, Default)]
pub struct SaveInspector {
    config: InspectorConfig,
    archives: ArchiveStore,
}

impl SaveInspector {
    pub fn new(config: InspectorConfig) -> Self {
        let archives = ArchiveStore::new(config.archive().clone());
        Self { config, archives }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn archives(&self) -> &ArchiveStore {
        &self.archives
    }

    pub fn latest_archive(&self, directory: &Path) -> Result<PathBuf, SessionError> {
        self.archives
            .latest(directory)
            .ok_or_else(|| SessionError::NoSaves(directory.to_path_buf()))
    }

    /// Open the directory's history and fold in any legacy flat file.
    pub fn open_history(
        &self,
        directory: &Path,
    ) -> Result<(SnapshotHistory, MigrationOutcome), SessionError> {
        let history_config = self.config.history();
        let mut history = SnapshotHistory::open(directory, history_config)?;
        let outcome = history.migrate_legacy_if_present(&history_config.legacy_path(directory))?;
        Ok((history, outcome))
    }

    /// Read, derive and record the latest or every archive in `directory`.
    ///
    /// A directory without archives yields an empty report. Archives that
    /// cannot be decoded or stored are reported in `skipped` and the batch
    /// continues. An unreadable legacy history file is kept and reported as
    /// [`MigrationOutcome::Failed`]; other history failures abort the cycle.
    pub fn ingest(&self, directory: &Path, scope: IngestScope) -> Result<IngestReport, SessionError> {
        let files = match scope {
            IngestScope::All => self.archives.list_candidates(directory),
            IngestScope::Latest => self.archives.latest(directory).into_iter().collect(),
        };
        let mut report = IngestReport {
            files,
            ..IngestReport::default()
        };
        if report.files.is_empty() {
            info!(
                target: "save_inspector::session",
                path = %directory.display(),
                "session.no_saves"
            );
            return Ok(report);
        }

        let history_config = self.config.history();
        let mut history = SnapshotHistory::open(directory, history_config)?;
        let legacy_path = history_config.legacy_path(directory);
        let migration = match history.migrate_legacy_if_present(&legacy_path) {
            Ok(outcome) => outcome,
            Err(err) if err.is_legacy() => {
                warn!(
                    target: "save_inspector::session",
                    path = %legacy_path.display(),
                    error = %err,
                    "session.migration_failed"
                );
                MigrationOutcome::Failed {
                    reason: err.to_string(),
                }
            }
            Err(err) => return Err(err.into()),
        };
        report.migration = Some(migration);

        for path in &report.files {
            match self.record(&mut history, path) {
                Ok(save) => report.processed.push(save),
                Err(err) if err.aborts_cycle() => return Err(err),
                Err(err) => {
                    warn!(
                        target: "save_inspector::session",
                        path = %path.display(),
                        kind = %err.kind(),
                        error = %err,
                        "session.save_skipped"
                    );
                    report.skipped.push(SkippedSave {
                        path: path.clone(),
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            target: "save_inspector::session",
            path = %directory.display(),
            files = report.files.len(),
            processed = report.processed.len(),
            appended = report.appended(),
            skipped = report.skipped.len(),
            "session.ingested"
        );
        Ok(report)
    }

    fn record(
        &self,
        history: &mut SnapshotHistory,
        path: &Path,
    ) -> Result<ProcessedSave, SessionError> {
        let (snapshot, settings) = self.derive(path)?;
        let appended = history.append(&snapshot)?;
        Ok(ProcessedSave {
            path: path.to_path_buf(),
            snapshot,
            settings,
            appended,
        })
    }

    fn derive(&self, path: &Path) -> Result<(Snapshot, Option<SettingsRecord>), SessionError> {
        let world = self.archives.read_document(path)?;
        let snapshot = capture_snapshot(&world)?;
        let settings = match current_settings(&world) {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!(
                    target: "save_inspector::session",
                    path = %path.display(),
                    error = %err,
                    "session.settings_unavailable"
                );
                None
            }
        };
        Ok((snapshot, settings))
    }

    pub fn read_settings(&self, path: &Path) -> Result<SettingsRecord, SessionError> {
        let world = self.archives.read_document(path)?;
        Ok(current_settings(&world)?)
    }

    /// Apply `update` to the archive at `path` and commit it.
    ///
    /// Nothing is written when any value is rejected. Concurrent updates of
    /// the same archive from this process run one after another.
    pub fn update_settings(
        &self,
        path: &Path,
        update: &SettingsUpdate,
    ) -> Result<SettingsChange, SessionError> {
        let (key, lock) = path_lock(path);
        let result = {
            let _guard = lock.lock();
            self.update_locked(path, update)
        };
        release_path_lock(&key, lock);
        result
    }

    fn update_locked(
        &self,
        path: &Path,
        update: &SettingsUpdate,
    ) -> Result<SettingsChange, SessionError> {
        let mut world = self.archives.read_document(path)?;
        let mut editor = SettingsEditor::new(&mut world);
        let before = editor.get_all()?;
        let after = editor.update_all(update)?;
        if update.is_empty() {
            debug!(
                target: "save_inspector::session",
                path = %path.display(),
                "session.settings_unchanged"
            );
            return Ok(SettingsChange {
                path: path.to_path_buf(),
                before,
                after,
            });
        }
        self.archives.write_document(path, &world)?;

        info!(
            target: "save_inspector::session",
            path = %path.display(),
            fields = update.len(),
            "session.settings_updated"
        );
        Ok(SettingsChange {
            path: path.to_path_buf(),
            before,
            after,
        })
    }
}

type PathLocks = Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>;

fn path_locks() -> &'static PathLocks {
    static LOCKS: OnceLock<PathLocks> = OnceLock::new();
    LOCKS.get_or_init(PathLocks::default)
}

fn path_lock(path: &Path) -> (PathBuf, Arc<Mutex<()>>) {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let lock = path_locks().lock().entry(key.clone()).or_default().clone();
    (key, lock)
}

/// Drop the table entry once no other caller holds or waits on it.
fn release_path_lock(key: &Path, lock: Arc<Mutex<()>>) {
    let mut locks = path_locks().lock();
    // One reference in the table, one here.
    if Arc::strong_count(&lock) == 2 {
        locks.remove(key);
    }
}
