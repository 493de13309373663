//! Settings file watcher.
//!
//! Watches the directory holding the user settings file, so editors that save
//! by writing a temp file and renaming it over the original are still seen,
//! and calls back whenever that file is modified or created. The callback is
//! usually [`ReloadCoordinator::dispatch_reload`](crate::store::ReloadCoordinator::dispatch_reload),
//! which coalesces bursts on its own; the short debounce here only drops the
//! duplicate events a single save produces.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::store::ReloadCoordinator;

/// Poll interval used when the native backend is unavailable
const POLL_INTERVAL: Duration = Duration::from_millis(500);

type ChangeCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Keeps a file system watch alive for as long as it exists.
pub struct SettingsWatcher {
    _watcher: Box<dyn Watcher + Send>,
    path: PathBuf,
}

impl std::fmt::Debug for SettingsWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct ChangeFilter {
    filename: OsString,
    path: PathBuf,
    debounce: Duration,
    last_event: Arc<Mutex<Option<Instant>>>,
    on_change: ChangeCallback,
}

impl ChangeFilter {
    fn handle(&self, result: notify::Result<Event>) {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Settings watcher error: {}", e);
                return;
            }
        };
        // Create covers atomic saves.
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        if !event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|f| f == self.filename))
        {
            return;
        }

        {
            let now = Instant::now();
            let mut last = self.last_event.lock();
            if (*last).is_some_and(|at| now.duration_since(at) < self.debounce) {
                log::trace!("Debouncing settings change event");
                return;
            }
            *last = Some(now);
        }

        log::info!("Settings file changed: {}", self.path.display());
        (self.on_change)(&self.path);
    }
}

impl SettingsWatcher {
    /// Watch `settings_path` and call `on_change` after each save.
    ///
    /// The file itself may not exist yet; its directory must. Uses the native
    /// backend when available, else polls.
    pub fn new(
        settings_path: &Path,
        debounce: Duration,
        on_change: impl Fn(&Path) + Send + Sync + 'static,
    ) -> Result<Self> {
        let filename = settings_path
            .file_name()
            .context("Settings path has no filename")?
            .to_os_string();
        let parent = settings_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let parent = parent
            .canonicalize()
            .with_context(|| format!("Settings directory not found: {}", parent.display()))?;
        let path = parent.join(&filename);

        let filter = ChangeFilter {
            filename,
            path: path.clone(),
            debounce,
            last_event: Arc::new(Mutex::new(None)),
            on_change: Arc::new(on_change),
        };

        let mut watcher = Self::create_backend(filter)?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch settings directory: {}", parent.display()))?;

        log::info!("Settings hot reload: watching {}", path.display());
        Ok(Self {
            _watcher: watcher,
            path,
        })
    }

    /// Watch `settings_path` and queue a reload on `coordinator` for each save.
    pub fn for_coordinator(
        settings_path: &Path,
        debounce: Duration,
        coordinator: ReloadCoordinator,
    ) -> Result<Self> {
        Self::new(settings_path, debounce, move |_| {
            coordinator.dispatch_reload();
        })
    }

    /// The watched file, with its directory canonicalized
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_backend(filter: ChangeFilter) -> Result<Box<dyn Watcher + Send>> {
        let native = filter.clone();
        match notify::recommended_watcher(move |res: notify::Result<Event>| native.handle(res)) {
            Ok(w) => {
                log::debug!("Settings watcher: using native backend");
                Ok(Box::new(w))
            }
            Err(e) => {
                log::warn!(
                    "Settings watcher: native backend unavailable ({}); falling back to polling",
                    e
                );
                let poll = PollWatcher::new(
                    move |res: notify::Result<Event>| filter.handle(res),
                    NotifyConfig::default().with_poll_interval(POLL_INTERVAL),
                )
                .context("Failed to create fallback PollWatcher")?;
                Ok(Box::new(poll))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_watch_missing_file_in_existing_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        let watcher = SettingsWatcher::new(&path, Duration::from_millis(10), |_| {});
        assert!(watcher.is_ok(), "directory exists, file may be created later");
        let watcher = watcher.expect("watcher");
        assert!(watcher.path().ends_with("settings.json"));
        assert!(format!("{:?}", watcher).contains("SettingsWatcher"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let path = PathBuf::from("/nonexistent_termset_watcher_test/dir/settings.json");
        assert!(SettingsWatcher::new(&path, Duration::from_millis(10), |_| {}).is_err());
    }

    #[test]
    fn test_change_reaches_callback() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, "{}").expect("Failed to write settings");

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _watcher = SettingsWatcher::new(&path, Duration::from_millis(300), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("Failed to create watcher");

        std::thread::sleep(Duration::from_millis(100));
        fs::write(temp_dir.path().join("other.json"), "{}").expect("write other");
        fs::write(&path, r#"{ "profiles": [] }"#).expect("Failed to write settings");
        std::thread::sleep(Duration::from_millis(700));

        // Delivery is platform dependent; only bound it.
        assert!(hits.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn test_filter_ignores_other_files_and_debounces() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let filter = ChangeFilter {
            filename: OsString::from("settings.json"),
            path: PathBuf::from("/cfg/settings.json"),
            debounce: Duration::from_secs(60),
            last_event: Arc::new(Mutex::new(None)),
            on_change: Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        };
        let event = |name: &str| {
            Ok(Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
                .add_path(PathBuf::from("/cfg").join(name)))
        };

        filter.handle(event("other.json"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        filter.handle(event("settings.json"));
        filter.handle(event("settings.json"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        filter.handle(Ok(Event::new(EventKind::Remove(notify::event::RemoveKind::Any))
            .add_path(PathBuf::from("/cfg/settings.json"))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
