//! Core crate for the Timberborn save inspector.
//!
//! Reads `world.json` out of save archives, derives water and weather metrics
//! from it, edits the weather-duration settings in place, and keeps a
//! per-directory history of snapshots. [`SaveInspector`] ties these into the
//! processing cycle used by the CLI.

pub mod archive;
pub mod grid;
mod hashing;
pub mod history;
pub mod inspector_config;
pub mod metrics;
mod paths;
pub mod session;
pub mod settings;
pub mod watch;
pub mod world;

pub use archive::{ArchiveError, ArchiveMember, ArchiveStore};
pub use grid::{format_packed_values, parse_packed_grid, parse_packed_values, GridError};
pub use hashing::content_digest;
pub use history::{HistoryError, MigrationOutcome, SnapshotHistory};
pub use inspector_config::{
    load_inspector_config_from_env, ArchiveConfig, HistoryConfig, InspectorConfig,
    InspectorConfigError, RefreshConfig, BUILTIN_INSPECTOR_CONFIG, INSPECTOR_CONFIG_ENV,
};
pub use metrics::{
    capture_snapshot, clean_water, total_clean_water, tracked_grids, weather_summary,
    TrackedGrids,
};
pub use paths::sanitize_directory;
pub use session::{
    ErrorKind, IngestReport, IngestScope, ProcessedSave, SaveInspector, SessionError,
    SettingsChange, SkippedSave,
};
pub use settings::{coerce_setting, current_settings, SettingsEditor, SettingsError, SettingsUpdate};
pub use watch::{SaveWatcher, WatchError, WatchTrigger};
pub use world::{FieldLocator, GridField, MapSize, WorldDocument, WorldError};
