use std::path::Path;
use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use save_core::{IngestScope, SaveInspector, SaveWatcher, SettingsUpdate, WatchTrigger};
use tracing::{info, warn};

use crate::report;

/// How `load` and `history` print their results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
    /// JSON with the full snapshot records, grids included.
    JsonWithGrids,
}

impl Output {
    pub fn new(json: bool, grids: bool) -> Self {
        match (json, grids) {
            (false, _) => Output::Text,
            (true, false) => Output::Json,
            (true, true) => Output::JsonWithGrids,
        }
    }
}

pub fn load(
    inspector: &SaveInspector,
    directory: &Path,
    scope: IngestScope,
    output: Output,
) -> Result<()> {
    let report = inspector
        .ingest(directory, scope)
        .wrap_err_with(|| format!("failed to process {}", directory.display()))?;
    match output {
        Output::Text => print!("{}", report::ingest_summary(&report)),
        Output::Json | Output::JsonWithGrids => {
            let value = report::ingest_json(&report, output == Output::JsonWithGrids);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

pub fn show_settings(inspector: &SaveInspector, directory: &Path) -> Result<()> {
    let path = inspector.latest_archive(directory)?;
    let settings = inspector.read_settings(&path)?;
    println!("{}", path.display());
    print!("{}", report::settings_table(&settings));
    Ok(())
}

pub fn set_settings(
    inspector: &SaveInspector,
    directory: &Path,
    update: &SettingsUpdate,
) -> Result<()> {
    if update.is_empty() {
        return Err(eyre!("no settings given; pass at least one --<setting> value"));
    }
    let path = inspector.latest_archive(directory)?;
    let change = inspector
        .update_settings(&path, update)
        .wrap_err_with(|| format!("settings not changed in {}", path.display()))?;
    print!("{}", report::settings_change(&change));
    Ok(())
}

pub fn history(inspector: &SaveInspector, directory: &Path, output: Output) -> Result<()> {
    let (history, _) = inspector.open_history(directory)?;
    match output {
        Output::Text => print!("{}", report::timeline(&history.timeline()?)),
        Output::Json => println!("{}", serde_json::to_string_pretty(&history.timeline()?)?),
        Output::JsonWithGrids => {
            let value = report::history_json(&history.all()?);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

pub fn migrate(inspector: &SaveInspector, directory: &Path) -> Result<()> {
    let (_, outcome) = inspector.open_history(directory)?;
    print!("{}", report::migration(&outcome));
    Ok(())
}

pub fn members(inspector: &SaveInspector, file: &Path) -> Result<()> {
    let members = inspector.archives().members(file)?;
    print!("{}", report::members(&members));
    Ok(())
}

pub fn watch(
    inspector: &SaveInspector,
    directory: &Path,
    scope: IngestScope,
    interval: Option<Duration>,
) -> Result<()> {
    let mut refresh = inspector.config().refresh().clone();
    if let Some(interval) = interval {
        refresh = refresh.with_interval(interval);
    }
    let mut watcher = SaveWatcher::start(directory, &refresh, inspector.config().archive().extension())?;
    info!(
        path = %directory.display(),
        interval_secs = refresh.interval().as_secs(),
        "Watching for save changes"
    );

    run_cycle(inspector, directory, scope);
    while let Some(trigger) = watcher.next_trigger() {
        if let WatchTrigger::Changed(paths) = &trigger {
            info!(changed = paths.len(), "Saves changed");
        }
        run_cycle(inspector, directory, scope);
    }
    Ok(())
}

fn run_cycle(inspector: &SaveInspector, directory: &Path, scope: IngestScope) {
    match inspector.ingest(directory, scope) {
        Ok(report) => print!("{}", report::ingest_summary(&report)),
        Err(err) => warn!(kind = %err.kind(), "Processing cycle failed: {}", err),
    }
}
