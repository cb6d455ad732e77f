//! Change and interval triggers for re-running the processing cycle.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, warn};

use crate::inspector_config::RefreshConfig;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTrigger {
    /// Save archives were created, modified or removed.
    Changed(Vec<PathBuf>),
    /// The refresh interval elapsed without a change.
    Interval,
}

/// Watches one save directory, non-recursively.
pub struct SaveWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    extension: String,
    interval: Duration,
    debounce: Duration,
    next_tick: Instant,
}

impl SaveWatcher {
    pub fn start(
        directory: &Path,
        refresh: &RefreshConfig,
        extension: &str,
    ) -> Result<Self, WatchError> {
        let watch_err = |source| WatchError::Watch {
            path: directory.to_path_buf(),
            source,
        };
        let (sender, events) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = sender.send(res);
        })
        .map_err(watch_err)?;
        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(watch_err)?;

        debug!(
            target: "save_inspector::watch",
            path = %directory.display(),
            interval_ms = refresh.interval().as_millis() as u64,
            "watch.started"
        );
        Ok(Self {
            _watcher: watcher,
            events,
            extension: extension.trim_start_matches('.').to_string(),
            interval: refresh.interval(),
            debounce: refresh.debounce(),
            next_tick: Instant::now() + refresh.interval(),
        })
    }

    /// Block until the next trigger. Returns `None` once the watcher is gone.
    ///
    /// A burst of change events is collected for the debounce period and
    /// reported as one trigger. Any trigger restarts the interval.
    pub fn next_trigger(&mut self) -> Option<WatchTrigger> {
        loop {
            let now = Instant::now();
            if now >= self.next_tick {
                self.next_tick = now + self.interval;
                return Some(WatchTrigger::Interval);
            }

            match self.events.recv_timeout(self.next_tick - now) {
                Ok(Ok(event)) => {
                    let mut paths = self.relevant_paths(&event);
                    if paths.is_empty() {
                        continue;
                    }
                    self.drain_burst(&mut paths);
                    paths.sort();
                    paths.dedup();
                    self.next_tick = Instant::now() + self.interval;
                    return Some(WatchTrigger::Changed(paths));
                }
                Ok(Err(err)) => {
                    warn!(
                        target: "save_inspector::watch",
                        error = %err,
                        "watch.event_failed"
                    );
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn drain_burst(&self, paths: &mut Vec<PathBuf>) {
        let deadline = Instant::now() + self.debounce;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            match self.events.recv_timeout(remaining) {
                Ok(Ok(event)) => paths.extend(self.relevant_paths(&event)),
                Ok(Err(_)) => {}
                Err(_) => return,
            }
        }
    }

    fn relevant_paths(&self, event: &Event) -> Vec<PathBuf> {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|path| has_extension(path, &self.extension))
            .cloned()
            .collect()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn watcher(dir: &Path) -> SaveWatcher {
        let refresh = RefreshConfig::default().with_interval(Duration::from_secs(1));
        SaveWatcher::start(dir, &refresh, "timber").unwrap()
    }

    #[test]
    fn only_archive_changes_are_relevant() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher(dir.path());
        let save = dir.path().join("Autosave 3.timber");
        let temp = dir.path().join(".Autosave 3.timber1a2b.tmp");

        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(save.clone())
            .add_path(temp.clone());
        assert_eq!(watcher.relevant_paths(&created), vec![save.clone()]);

        let accessed = Event::new(EventKind::Access(AccessKind::Any)).add_path(save.clone());
        assert!(watcher.relevant_paths(&accessed).is_empty());

        let db = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(dir.path().join("historical_data.db"));
        assert!(watcher.relevant_paths(&db).is_empty());
    }

    #[test]
    fn idle_directory_triggers_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = watcher(dir.path());
        let started = Instant::now();
        assert_eq!(watcher.next_trigger(), Some(WatchTrigger::Interval));
        assert!(started.elapsed() >= Duration::from_millis(900));
    }
}
