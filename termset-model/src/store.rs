//! Snapshot publication and coalesced reloads.
//!
//! Readers take an `Arc<CascadeSettings>` from [`SettingsStore::snapshot`]
//! and never block. A reload resolves a complete new snapshot off to the side
//! and swaps it in only when the load succeeded, so nobody ever sees a
//! half-built configuration.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{SettingsLoadError, SettingsLoadWarning};
use crate::settings::{CascadeSettings, SettingsLoader};
use crate::sources::SettingsSources;

/// How long a reload waits for further change signals before running
pub const RELOAD_QUIESCE: Duration = Duration::from_millis(50);

/// Produces fresh documents for a reload, typically by reading files.
pub type SourceProvider = dyn Fn() -> Result<SettingsSources, SettingsLoadError> + Send + Sync;

/// Called on the reload thread after each reload attempt.
pub type ReloadListener = dyn Fn(&ReloadReport) + Send + Sync;

/// Holds the published settings snapshot.
#[derive(Debug)]
pub struct SettingsStore {
    current: ArcSwap<CascadeSettings>,
}

impl SettingsStore {
    pub fn new(settings: Arc<CascadeSettings>) -> Self {
        Self {
            current: ArcSwap::new(settings),
        }
    }

    /// Load the first snapshot. Falls back to the built-in defaults on a fatal
    /// error, which is returned for display.
    pub fn initial_load(
        loader: &SettingsLoader,
        sources: Result<SettingsSources, SettingsLoadError>,
    ) -> (Self, Option<SettingsLoadError>) {
        let outcome = loader.load_or_fallback(sources);
        (Self::new(outcome.settings), outcome.error)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<CascadeSettings> {
        self.current.load_full()
    }

    /// Replace the current snapshot.
    pub fn publish(&self, settings: Arc<CascadeSettings>) {
        log::info!(
            "Publishing settings: {} active profile(s), {} warning(s)",
            settings.active_profiles().len(),
            settings.warnings().len()
        );
        self.current.store(settings);
    }
}

/// What happened on the last reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReport {
    /// New settings were published
    Applied { warnings: Vec<SettingsLoadWarning> },
    /// The load failed; the previous settings stay in effect
    Failed(SettingsLoadError),
}

/// Coalesces change signals into reloads. At most one reload is queued or
/// running at any time.
#[derive(Clone)]
pub struct ReloadCoordinator {
    store: Arc<SettingsStore>,
    loader: Arc<SettingsLoader>,
    provider: Arc<SourceProvider>,
    listener: Option<Arc<ReloadListener>>,
    in_flight: Arc<AtomicBool>,
    quiesce: Duration,
    last_report: Arc<Mutex<Option<ReloadReport>>>,
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .field("quiesce", &self.quiesce)
            .field("last_report", &*self.last_report.lock())
            .finish_non_exhaustive()
    }
}

impl ReloadCoordinator {
    pub fn new(
        store: Arc<SettingsStore>,
        loader: Arc<SettingsLoader>,
        provider: impl Fn() -> Result<SettingsSources, SettingsLoadError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            loader,
            provider: Arc::new(provider),
            listener: None,
            in_flight: Arc::new(AtomicBool::new(false)),
            quiesce: RELOAD_QUIESCE,
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    /// Builder method to change the quiescence window
    pub fn with_quiesce(mut self, quiesce: Duration) -> Self {
        self.quiesce = quiesce;
        self
    }

    /// Builder method to observe every reload attempt
    pub fn with_listener(mut self, listener: impl Fn(&ReloadReport) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Whether a reload is queued or running
    pub fn is_reload_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Report of the most recent finished reload
    pub fn last_report(&self) -> Option<ReloadReport> {
        self.last_report.lock().clone()
    }

    /// Queue a reload after the quiescence window.
    ///
    /// Returns `false` when one is already queued; that reload will pick up
    /// this change too.
    pub fn dispatch_reload(&self) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("Settings reload already queued");
            return false;
        }

        let worker = self.clone();
        let spawned = std::thread::Builder::new()
            .name("settings-reload".into())
            .spawn(move || {
                let _clear = InFlightGuard(Arc::clone(&worker.in_flight));
                std::thread::sleep(worker.quiesce);
                worker.reload_now();
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn settings reload thread: {}", e);
            self.in_flight.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Reload on the calling thread, publishing on success.
    pub fn reload_now(&self) -> ReloadReport {
        let provider = Arc::clone(&self.provider);
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| provider()))
            .unwrap_or_else(|_| {
                Err(SettingsLoadError::Unknown(
                    "settings source provider panicked".to_string(),
                ))
            })
            .and_then(|sources| self.loader.load(&sources));

        let report = match attempt {
            Ok(settings) => {
                let warnings = settings.warnings().to_vec();
                self.store.publish(Arc::new(settings));
                ReloadReport::Applied { warnings }
            }
            Err(error) => {
                log::warn!("Settings reload failed, keeping current settings: {error}");
                ReloadReport::Failed(error)
            }
        };

        *self.last_report.lock() = Some(report.clone());
        if let Some(listener) = &self.listener {
            listener(&report);
        }
        report
    }
}

/// Clears the in-flight flag when the reload thread finishes, panics
/// included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULTS_JSON;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn wait_until_idle(coordinator: &ReloadCoordinator) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while coordinator.is_reload_pending() {
            assert!(Instant::now() < deadline, "reload did not finish in time");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn store_with_defaults() -> Arc<SettingsStore> {
        Arc::new(SettingsStore::new(Arc::new(SettingsLoader::load_defaults())))
    }

    #[test]
    fn test_initial_load_falls_back_and_reports() {
        let (store, error) = SettingsStore::initial_load(
            &SettingsLoader::new(),
            Err(SettingsLoadError::JsonParse("* Line 1, Column 1 (settings)\n  bad".into())),
        );
        assert!(matches!(error, Some(SettingsLoadError::JsonParse(_))));
        assert_eq!(store.snapshot().active_profiles().len(), 1);
    }

    #[test]
    fn test_signals_within_window_coalesce() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let coordinator = ReloadCoordinator::new(
            store_with_defaults(),
            Arc::new(SettingsLoader::new()),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                SettingsSources::parse(DEFAULTS_JSON, None)
            },
        )
        .with_quiesce(Duration::from_millis(100));

        assert!(coordinator.dispatch_reload());
        assert!(!coordinator.dispatch_reload());
        assert!(!coordinator.dispatch_reload());
        wait_until_idle(&coordinator);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            coordinator.last_report(),
            Some(ReloadReport::Applied { warnings: Vec::new() })
        );
    }

    #[test]
    fn test_failed_reload_keeps_current_snapshot() {
        let store = store_with_defaults();
        let before = store.snapshot();
        let coordinator = ReloadCoordinator::new(
            Arc::clone(&store),
            Arc::new(SettingsLoader::new()),
            || SettingsSources::parse(DEFAULTS_JSON, Some(r#"{ "profiles": [] "#)),
        );

        let report = coordinator.reload_now();
        assert!(matches!(report, ReloadReport::Failed(SettingsLoadError::JsonParse(_))));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_successful_reload_publishes_with_warnings() {
        let store = store_with_defaults();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let coordinator = ReloadCoordinator::new(
            Arc::clone(&store),
            Arc::new(SettingsLoader::new()),
            || {
                SettingsSources::parse(
                    DEFAULTS_JSON,
                    Some(r#"{ "defaultProfile": "Nobody", "profiles": [{ "name": "Fresh" }] }"#),
                )
            },
        )
        .with_listener(move |report| sink.lock().push(report.clone()));

        let report = coordinator.reload_now();
        assert_eq!(
            report,
            ReloadReport::Applied {
                warnings: vec![SettingsLoadWarning::MissingDefaultProfile]
            }
        );
        assert_eq!(store.snapshot().active_profiles()[0].name, "Fresh");
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_provider_panic_is_reported_and_flag_cleared() {
        let coordinator = ReloadCoordinator::new(
            store_with_defaults(),
            Arc::new(SettingsLoader::new()),
            || panic!("disk on fire"),
        )
        .with_quiesce(Duration::from_millis(1));

        assert!(coordinator.dispatch_reload());
        wait_until_idle(&coordinator);
        assert!(matches!(
            coordinator.last_report(),
            Some(ReloadReport::Failed(SettingsLoadError::Unknown(_)))
        ));
        assert!(coordinator.dispatch_reload(), "flag was cleared");
        wait_until_idle(&coordinator);
    }
}
