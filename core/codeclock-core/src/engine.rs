//! TimerEngine - owns the running timers and the in-memory records.
//!
//! One global timer counts seconds while the editor is running at all; one
//! timer per launched project counts seconds while that project is open and
//! files them under today's date. Every tick:
//!
//! 1. probes the [`ActivityMonitor`] (the only await in a tick),
//! 2. on activity, increments the record and persists it,
//! 3. always emits the current snapshot to the [`EventSink`].
//!
//! Timers are Tokio tasks on a fixed interval. Stopping aborts the task; since
//! the probe is the only suspension point, an abort never splits the
//! mutate-persist-emit section of a tick.
//!
//! ## Locking
//!
//! The global record and the project mapping each sit behind a `Mutex`. The
//! project lock is held across mutate + serialize + write so that every write
//! of the whole mapping includes every increment made before it. No lock is
//! held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityMonitor, SystemActivityDetector};
use crate::clock::{Clock, SystemClock};
use crate::config::ClockConfig;
use crate::error::Result;
use crate::events::{EventSink, TimerEvent};
use crate::launcher::{EditorExit, EditorLauncher, ExitWatch, SystemEditorLauncher};
use crate::rollup::{date_key, recent_window_seconds_on, summarize, TimeSummary};
use crate::storage::StorageConfig;
use crate::store::TimeStore;
use crate::types::{GlobalTimerRecord, ProjectRecords, ProjectTimerRecord};

/// Collaborators the engine is built from.
pub struct EngineParts {
    pub store: TimeStore,
    pub monitor: ActivityMonitor,
    pub launcher: Arc<dyn EditorLauncher>,
    pub sink: Arc<dyn EventSink>,
    pub clock: Arc<dyn Clock>,
    pub tick_interval: Duration,
    /// Delay between the editor CLI exiting and the open-project re-check.
    pub exit_grace: Duration,
}

/// Cheaply cloneable handle to the timer engine.
#[derive(Clone)]
pub struct TimerEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    store: TimeStore,
    monitor: ActivityMonitor,
    launcher: Arc<dyn EditorLauncher>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    exit_grace: Duration,
    global: Mutex<GlobalTimerRecord>,
    projects: Mutex<ProjectRecords>,
    global_timer: Mutex<Option<JoinHandle<()>>>,
    project_timers: Mutex<HashMap<String, JoinHandle<()>>>,
    exit_watchers: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_live(handle: &JoinHandle<()>) -> bool {
    !handle.is_finished()
}

impl TimerEngine {
    /// Builds an engine and loads both records from the store.
    pub fn new(parts: EngineParts) -> Self {
        let global = parts.store.load_global();
        let projects = parts.store.load_project_records();
        info!(
            global_seconds = global.seconds_total,
            projects = projects.len(),
            "Timer records loaded"
        );

        Self {
            inner: Arc::new(EngineInner {
                store: parts.store,
                monitor: parts.monitor,
                launcher: parts.launcher,
                sink: parts.sink,
                clock: parts.clock,
                tick_interval: parts.tick_interval,
                exit_grace: parts.exit_grace,
                global: Mutex::new(global),
                projects: Mutex::new(projects),
                global_timer: Mutex::new(None),
                project_timers: Mutex::new(HashMap::new()),
                exit_watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Builds an engine backed by the real process table, editor and clock.
    pub fn from_config(storage: StorageConfig, config: &ClockConfig, sink: Arc<dyn EventSink>) -> Self {
        let detector = Arc::new(SystemActivityDetector::from_config(config));
        Self::new(EngineParts {
            store: TimeStore::new(storage),
            monitor: ActivityMonitor::new(detector, config.probe_timeout()),
            launcher: Arc::new(SystemEditorLauncher::new(config.editor.clone())),
            sink,
            clock: Arc::new(SystemClock),
            tick_interval: config.tick_interval(),
            exit_grace: config.exit_grace(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Global timer
    // ─────────────────────────────────────────────────────────────────────────────

    /// Starts the global timer. Returns false if it was already running.
    ///
    /// With `initial_check`, the persisted total is emitted right away instead
    /// of after the first interval.
    pub fn start_global(&self, initial_check: bool) -> bool {
        let mut slot = lock(&self.inner.global_timer);
        if slot.as_ref().is_some_and(is_live) {
            return false;
        }
        if initial_check {
            self.inner.emit_global();
        }
        let inner = Arc::clone(&self.inner);
        *slot = Some(tokio::spawn(inner.run_global()));
        debug!("Global timer started");
        true
    }

    /// Stops the global timer. Returns false if it was not running.
    pub fn stop_global(&self) -> bool {
        match lock(&self.inner.global_timer).take() {
            Some(handle) => {
                let was_running = is_live(&handle);
                handle.abort();
                debug!("Global timer stopped");
                was_running
            }
            None => false,
        }
    }

    pub fn is_global_running(&self) -> bool {
        lock(&self.inner.global_timer).as_ref().is_some_and(is_live)
    }

    /// Runs one global tick immediately. Returns whether the editor was active.
    pub async fn tick_global(&self) -> bool {
        self.inner.tick_global().await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Project timers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Starts the timer for `project_path`. Returns false if one is already running.
    pub fn start_project(&self, project_path: &str, initial_check: bool) -> bool {
        let mut timers = lock(&self.inner.project_timers);
        if timers.get(project_path).is_some_and(is_live) {
            return false;
        }
        if initial_check {
            self.inner.emit_project(project_path);
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_project(project_path.to_string()));
        timers.insert(project_path.to_string(), handle);
        debug!(project = %project_path, "Project timer started");
        true
    }

    /// Stops the timer for `project_path`. Returns false if it was not running.
    pub fn stop_project(&self, project_path: &str) -> bool {
        match lock(&self.inner.project_timers).remove(project_path) {
            Some(handle) => {
                let was_running = is_live(&handle);
                handle.abort();
                debug!(project = %project_path, "Project timer stopped");
                was_running
            }
            None => false,
        }
    }

    pub fn is_project_running(&self, project_path: &str) -> bool {
        lock(&self.inner.project_timers)
            .get(project_path)
            .is_some_and(is_live)
    }

    /// Paths whose timers are currently running, sorted.
    pub fn running_projects(&self) -> Vec<String> {
        let mut paths: Vec<String> = lock(&self.inner.project_timers)
            .iter()
            .filter(|(_, handle)| is_live(handle))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Runs one tick for `project_path` immediately. Returns whether it was open.
    pub async fn tick_project(&self, project_path: &str) -> bool {
        self.inner.tick_project(project_path).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Launching
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens `project_path` in the editor and makes sure its timer runs.
    ///
    /// Returns once the editor process is spawned; it does not wait for it.
    /// Launch errors are emitted as [`TimerEvent::LaunchFailed`] and returned.
    ///
    /// The editor CLI usually hands off to a running instance and exits at
    /// once, so after it exits the engine waits `exit_grace` before checking
    /// the project again. The timer is stopped only if the project is not open
    /// by then.
    pub fn launch_project(&self, project_path: &str) -> Result<()> {
        info!(project = %project_path, "Launching project");

        let exit = match self.inner.launcher.launch(project_path) {
            Ok(exit) => exit,
            Err(err) => {
                error!(error = %err, project = %project_path, "Failed to launch project");
                self.inner.sink.emit(TimerEvent::LaunchFailed {
                    project_path: project_path.to_string(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        lock(&self.inner.projects)
            .entry(project_path.to_string())
            .or_default();

        if !self.start_project(project_path, true) {
            debug!(project = %project_path, "Project timer already running");
        }

        let engine = self.clone();
        let watcher = tokio::spawn(engine.watch_exit(project_path.to_string(), exit));
        let mut watchers = lock(&self.inner.exit_watchers);
        watchers.retain(is_live);
        watchers.push(watcher);

        Ok(())
    }

    async fn watch_exit(self, project_path: String, exit: ExitWatch) {
        match exit.await {
            Ok(EditorExit { code }) => {
                info!(project = %project_path, code = ?code, "Editor process exited");
            }
            Err(_) => {
                debug!(project = %project_path, "Editor exit notification dropped");
            }
        }

        tokio::time::sleep(self.inner.exit_grace).await;

        if self.inner.monitor.is_project_open(&project_path).await {
            debug!(project = %project_path, "Project still open after editor exit, keeping timer");
        } else if self.stop_project(&project_path) {
            info!(project = %project_path, "Project no longer open, timer stopped");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Stops every timer and exit watcher, then writes both records once more.
    ///
    /// Both writes are attempted; the first failure is returned.
    pub fn shutdown(&self) -> Result<()> {
        self.stop_global();

        let paths: Vec<String> = lock(&self.inner.project_timers).keys().cloned().collect();
        for path in &paths {
            self.stop_project(path);
        }

        for watcher in lock(&self.inner.exit_watchers).drain(..) {
            watcher.abort();
        }

        let global_result = {
            let record = lock(&self.inner.global);
            self.inner.store.save_global(&record)
        };
        if let Err(err) = &global_result {
            error!(error = %err, "Failed to persist global timer on shutdown");
        }

        let projects_result = {
            let records = lock(&self.inner.projects);
            self.inner.store.save_project_records(&records)
        };
        if let Err(err) = &projects_result {
            error!(error = %err, "Failed to persist project timers on shutdown");
        }

        info!(stopped_projects = paths.len(), "Timer engine shut down");
        global_result.and(projects_result)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn global_seconds(&self) -> u64 {
        lock(&self.inner.global).seconds_total
    }

    pub fn project_record(&self, project_path: &str) -> Option<ProjectTimerRecord> {
        lock(&self.inner.projects).get(project_path).cloned()
    }

    /// Today / rolling window / total for `project_path`, if it has a record.
    pub fn project_snapshot(&self, project_path: &str) -> Option<TimeSummary> {
        let today = self.inner.clock.today();
        lock(&self.inner.projects)
            .get(project_path)
            .map(|record| summarize(record, today))
    }

    pub fn project_records(&self) -> ProjectRecords {
        lock(&self.inner.projects).clone()
    }

    /// Today's date as the engine sees it.
    pub fn today(&self) -> NaiveDate {
        self.inner.clock.today()
    }
}

impl EngineInner {
    fn ticker(&self) -> tokio::time::Interval {
        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    async fn run_global(self: Arc<Self>) {
        let mut ticker = self.ticker();
        loop {
            ticker.tick().await;
            self.tick_global().await;
        }
    }

    async fn run_project(self: Arc<Self>, project_path: String) {
        let mut ticker = self.ticker();
        loop {
            ticker.tick().await;
            self.tick_project(&project_path).await;
        }
    }

    async fn tick_global(&self) -> bool {
        let active = self.monitor.is_editor_running().await;

        let seconds = {
            let mut record = lock(&self.global);
            if active {
                record.seconds_total += 1;
                if let Err(err) = self.store.save_global(&record) {
                    warn!(error = %err, "Failed to persist global timer, will retry next tick");
                }
            }
            record.seconds_total
        };

        self.sink.emit(TimerEvent::GlobalTimerUpdated { seconds });
        active
    }

    async fn tick_project(&self, project_path: &str) -> bool {
        let active = self.monitor.is_project_open(project_path).await;
        let today = self.clock.today();

        let event = {
            let mut records = lock(&self.projects);
            if active {
                records
                    .entry(project_path.to_string())
                    .or_default()
                    .record_second(&date_key(today));
                if let Err(err) = self.store.save_project_records(&records) {
                    warn!(
                        error = %err,
                        project = %project_path,
                        "Failed to persist project timers, will retry next tick"
                    );
                }
            }
            project_event(project_path, records.get(project_path), today)
        };

        self.sink.emit(event);
        active
    }

    fn emit_global(&self) {
        let seconds = lock(&self.global).seconds_total;
        self.sink.emit(TimerEvent::GlobalTimerUpdated { seconds });
    }

    fn emit_project(&self, project_path: &str) {
        let today = self.clock.today();
        let event = {
            let records = lock(&self.projects);
            project_event(project_path, records.get(project_path), today)
        };
        self.sink.emit(event);
    }
}

fn project_event(
    project_path: &str,
    record: Option<&ProjectTimerRecord>,
    today: NaiveDate,
) -> TimerEvent {
    let (seconds, daily_times) = record
        .map(|r| (r.seconds_total, r.daily_times.clone()))
        .unwrap_or_default();
    let recent_window_seconds = recent_window_seconds_on(&daily_times, today);
    TimerEvent::ProjectTimerUpdated {
        project_path: project_path.to_string(),
        seconds,
        daily_times,
        recent_window_seconds,
    }
}
