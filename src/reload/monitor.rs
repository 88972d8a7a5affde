//! File watcher driving hot reload
//!
//! The notify watcher runs on its own thread and only forwards changed paths
//! over a channel. Everything else happens on the caller's thread inside
//! [`ArchitectureMonitor::poll_reload`], which the simulator calls between
//! time steps.

use super::{merge_source, Simulator};
use crate::config::ArchConfig;
use crate::ir::{parse_architecture, ArchitectureMeta, ParseMode, ARCHITECTURE_EXTENSION};
use crate::structure::NeuralStructure;
use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Reload event emitted when changes were merged into the live structure
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// Path of the reloaded file
    pub path: PathBuf,
    /// Timestamp of reload
    pub timestamp: Instant,
    /// Steps whose parameters changed
    pub changed_steps: usize,
    /// Parameters written in total
    pub changed_params: usize,
    /// Steps only in the new file
    pub added: Vec<String>,
    /// Steps missing from the new file
    pub dropped: Vec<String>,
}

/// Monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for changes
    Idle,
    /// Merging a changed file
    Reloading,
}

/// Watches one architecture file and merges its changes
pub struct ArchitectureMonitor {
    /// Path being watched
    watch_path: PathBuf,
    /// File watcher
    _watcher: RecommendedWatcher,
    /// Channel for file change events
    change_rx: Receiver<PathBuf>,
    /// Debounce duration to avoid rapid reloads
    debounce: Duration,
    /// Last change time for debouncing
    last_change: Option<Instant>,
    /// Pending reload path
    pending_path: Option<PathBuf>,
    state: MonitorState,
    /// Live configuration; reloads never change it
    config: ArchConfig,
}

impl ArchitectureMonitor {
    /// Create a monitor watching a single file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let watch_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            }
        })
        .context("Failed to create file watcher")?;

        // Editors often replace the file, so watch its directory
        if let Some(parent) = watch_path.parent() {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .context("Failed to watch directory")?;
        }

        let config = ArchConfig::default();
        Ok(Self {
            watch_path,
            _watcher: watcher,
            change_rx: rx,
            debounce: config.debounce(),
            last_change: None,
            pending_path: None,
            state: MonitorState::Idle,
            config,
        })
    }

    /// Use the live configuration (also sets the debounce).
    pub fn with_config(mut self, config: ArchConfig) -> Self {
        self.debounce = config.debounce();
        self.config = config;
        self
    }

    /// Set debounce duration
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce = duration;
        self
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn config(&self) -> &ArchConfig {
        &self.config
    }

    /// Schedule a reload as if the file had changed.
    pub fn request_reload(&mut self) {
        self.pending_path = Some(self.watch_path.clone());
        self.last_change = Some(Instant::now());
    }

    /// Drain watcher events; returns the path once its debounce has passed.
    pub fn poll_changes(&mut self) -> Result<Option<PathBuf>> {
        loop {
            match self.change_rx.try_recv() {
                Ok(path) => {
                    if self.is_watched(&path) {
                        self.pending_path = Some(path);
                        self.last_change = Some(Instant::now());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    anyhow::bail!("File watcher disconnected");
                }
            }
        }

        if let (Some(_), Some(last_change)) = (&self.pending_path, self.last_change) {
            if last_change.elapsed() >= self.debounce {
                self.last_change = None;
                return Ok(self.pending_path.take());
            }
        }
        Ok(None)
    }

    fn is_watched(&self, path: &Path) -> bool {
        path == self.watch_path
            || (path.file_name() == self.watch_path.file_name()
                && path.extension().map_or(false, |e| e == ARCHITECTURE_EXTENSION))
    }

    /// Poll for a pending change and merge it into `live`.
    ///
    /// Call only between time steps. A file that cannot be read, parsed, or
    /// merged is logged and skipped; `live` is left untouched in that case.
    /// Errors are returned only when the watcher itself has failed.
    pub fn poll_reload(
        &mut self,
        live: &mut NeuralStructure,
        simulator: &mut dyn Simulator,
    ) -> Result<Option<ReloadEvent>> {
        match self.poll_changes()? {
            Some(path) => Ok(self.reload_from(&path, live, simulator)),
            None => Ok(None),
        }
    }

    /// Merge the contents of `path` into `live` now.
    pub fn reload_from(
        &mut self,
        path: &Path,
        live: &mut NeuralStructure,
        simulator: &mut dyn Simulator,
    ) -> Option<ReloadEvent> {
        self.state = MonitorState::Reloading;
        let result = self.try_reload(path, live, simulator);
        self.state = MonitorState::Idle;

        match result {
            Ok(event) => {
                log::info!(
                    "Reloaded {}: {} steps, {} parameters changed",
                    path.display(),
                    event.changed_steps,
                    event.changed_params
                );
                Some(event)
            }
            Err(e) => {
                log::error!("Hot reload aborted, keeping live architecture: {:#}", e);
                None
            }
        }
    }

    fn try_reload(
        &self,
        path: &Path,
        live: &mut NeuralStructure,
        simulator: &mut dyn Simulator,
    ) -> Result<ReloadEvent> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let changes = merge_source(live, &source, &self.config, simulator)
            .with_context(|| format!("Failed to merge {}", path.display()))?;

        Ok(ReloadEvent {
            path: path.to_path_buf(),
            timestamp: Instant::now(),
            changed_steps: changes.changed.len(),
            changed_params: changes.changed_param_count(),
            added: changes.added,
            dropped: changes.dropped,
        })
    }
}

/// Managed hot-reloadable architecture
///
/// Owns the live structure together with the monitor for its source file.
pub struct ReloadableArchitecture {
    structure: NeuralStructure,
    meta: ArchitectureMeta,
    monitor: ArchitectureMonitor,
    /// Reload history
    reload_history: Vec<ReloadEvent>,
    /// Max history entries
    max_history: usize,
}

impl ReloadableArchitecture {
    /// Create from a .dfa file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let arch = parse_architecture(&source, ParseMode::Initial)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let max_history = arch.config.max_reload_history;
        let monitor = ArchitectureMonitor::new(path)?.with_config(arch.config);

        Ok(Self {
            structure: arch.structure,
            meta: arch.meta,
            monitor,
            reload_history: Vec::new(),
            max_history,
        })
    }

    /// Set max history entries
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    /// Check for and apply any pending reloads
    ///
    /// Returns true if changes were merged.
    pub fn check_reload(&mut self, simulator: &mut dyn Simulator) -> Result<bool> {
        match self.monitor.poll_reload(&mut self.structure, simulator)? {
            Some(event) => {
                self.record(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reload the source file now, bypassing the watcher.
    pub fn reload_now(&mut self, simulator: &mut dyn Simulator) -> bool {
        let path = self.monitor.watch_path().to_path_buf();
        match self.monitor.reload_from(&path, &mut self.structure, simulator) {
            Some(event) => {
                self.record(event);
                true
            }
            None => false,
        }
    }

    fn record(&mut self, event: ReloadEvent) {
        self.reload_history.push(event);
        if self.reload_history.len() > self.max_history {
            self.reload_history.remove(0);
        }
    }

    pub fn structure(&self) -> &NeuralStructure {
        &self.structure
    }

    /// Mutable access, e.g. to register observers.
    pub fn structure_mut(&mut self) -> &mut NeuralStructure {
        &mut self.structure
    }

    pub fn meta(&self) -> &ArchitectureMeta {
        &self.meta
    }

    pub fn config(&self) -> &ArchConfig {
        self.monitor.config()
    }

    pub fn monitor(&self) -> &ArchitectureMonitor {
        &self.monitor
    }

    pub fn monitor_mut(&mut self) -> &mut ArchitectureMonitor {
        &mut self.monitor
    }

    /// Get reload history
    pub fn reload_history(&self) -> &[ReloadEvent] {
        &self.reload_history
    }

    /// Get last reload event
    pub fn last_reload(&self) -> Option<&ReloadEvent> {
        self.reload_history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::simulator::testing::RecordingSimulator;
    use crate::steps::ParamValue;
    use std::io::Write;

    const V1: &str = r#"
.meta
    name "monitor_test"

.config
    reload_debounce_ms 0

.step field "F"
    dimensions    [11]
    resting_level -5

.step node "N"
.connect "F" -> "N"
"#;

    fn write_file(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn test_request_reload_merges_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.dfa");
        write_file(&path, V1);

        let mut arch = ReloadableArchitecture::from_file(&path).unwrap();
        assert_eq!(arch.meta().name.as_deref(), Some("monitor_test"));
        assert_eq!(arch.config().reload_debounce_ms, 0);

        write_file(&path, &V1.replace("resting_level -5", "resting_level -2"));
        arch.monitor_mut().request_reload();

        let mut sim = RecordingSimulator::default();
        assert!(arch.check_reload(&mut sim).unwrap());
        assert_eq!(
            arch.structure().get_step_by_name("F").unwrap().param("resting_level"),
            Some(ParamValue::Float(-2.0))
        );
        assert_eq!(sim.calls_for("F"), vec!["constants", "tensors"]);

        let event = arch.last_reload().unwrap();
        assert_eq!(event.changed_steps, 1);
        assert_eq!(event.changed_params, 1);
        assert_eq!(arch.monitor().state(), MonitorState::Idle);
    }

    #[test]
    fn test_broken_file_keeps_live_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.dfa");
        write_file(&path, V1);
        let mut arch = ReloadableArchitecture::from_file(&path).unwrap();

        write_file(&path, &V1.replace("resting_level -5", "resting_level [oops"));
        let mut sim = RecordingSimulator::default();
        assert!(!arch.reload_now(&mut sim));

        // Kind change is rejected as a whole
        write_file(
            &path,
            &V1.replace("resting_level -5", "resting_level -1")
                .replace(".step node \"N\"", ".step scalar \"N\"")
                .replace(".connect \"F\" -> \"N\"", ".connect \"F\" -> \"N\"\n    contract_dimensions [0]"),
        );
        assert!(!arch.reload_now(&mut sim));

        assert!(sim.calls.is_empty());
        assert_eq!(
            arch.structure().get_step_by_name("F").unwrap().param("resting_level"),
            Some(ParamValue::Float(-5.0))
        );
        assert!(arch.reload_history().is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.dfa");
        write_file(&path, V1);
        let mut arch = ReloadableArchitecture::from_file(&path).unwrap().with_max_history(2);

        let mut sim = RecordingSimulator::default();
        for level in ["-4", "-3", "-2"] {
            write_file(&path, &V1.replace("resting_level -5", &format!("resting_level {}", level)));
            assert!(arch.reload_now(&mut sim));
        }
        assert_eq!(arch.reload_history().len(), 2);
    }

    #[test]
    fn test_debounce_holds_back_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.dfa");
        write_file(&path, V1);

        let mut monitor = ArchitectureMonitor::new(&path)
            .unwrap()
            .with_debounce(Duration::from_secs(3600));
        monitor.request_reload();
        assert!(monitor.poll_changes().unwrap().is_none());

        let mut monitor = monitor.with_debounce(Duration::ZERO);
        assert_eq!(monitor.poll_changes().unwrap().as_deref(), Some(monitor.watch_path()));
        assert!(monitor.poll_changes().unwrap().is_none());
    }

    #[test]
    fn test_file_change_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arch.dfa");
        write_file(&path, V1);
        let mut arch = ReloadableArchitecture::from_file(&path).unwrap();

        write_file(&path, &V1.replace("resting_level -5", "resting_level -1"));

        // The truncating write may be seen first, so wait for the final content
        let mut sim = RecordingSimulator::default();
        let deadline = Instant::now() + Duration::from_secs(5);
        let resting_level = |arch: &ReloadableArchitecture| {
            arch.structure().get_step_by_name("F").unwrap().param("resting_level")
        };
        while Instant::now() < deadline && resting_level(&arch) != Some(ParamValue::Float(-1.0)) {
            arch.check_reload(&mut sim).unwrap();
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(resting_level(&arch), Some(ParamValue::Float(-1.0)));
        assert!(!arch.reload_history().is_empty());
    }
}
