//! File change notifications for managed configurations.
//!
//! The watcher never reloads anything itself. It raises a flag when the watched
//! file is touched, and the owning cache consumes that flag on its next access.

use crate::error::{ConfigError, ConfigResult};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Type alias for change callback functions, run on the notification thread.
pub type ChangeCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Watches one file and records whether it changed since it was last checked.
///
/// The parent directory is watched rather than the file, so replacing the file
/// by rename (as most editors do) is still noticed.
pub struct ChangeWatcher {
    _watcher: Mutex<RecommendedWatcher>,
    changed: Arc<AtomicBool>,
    callbacks: Arc<Mutex<Vec<ChangeCallback>>>,
    path: PathBuf,
}

impl ChangeWatcher {
    /// Starts watching `path`.
    ///
    /// # Errors
    /// * `ConfigError::FileWatch` - If the file name is missing or the directory cannot be watched
    pub fn watch(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| {
                ConfigError::file_watch(format!("cannot watch '{}': no file name", path.display()))
            })?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let changed = Arc::new(AtomicBool::new(false));
        let callbacks: Arc<Mutex<Vec<ChangeCallback>>> = Arc::new(Mutex::new(Vec::new()));

        let flag = Arc::clone(&changed);
        let handlers = Arc::clone(&callbacks);
        let watched = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if touches_file {
                        trace!(path = %watched.display(), kind = ?event.kind, "configuration file changed");
                        flag.store(true, Ordering::SeqCst);
                        // Run outside the lock so a callback may register another.
                        let callbacks: Vec<ChangeCallback> = handlers.lock().clone();
                        for callback in &callbacks {
                            callback(&watched);
                        }
                    }
                }
                Err(e) => {
                    // Missed events cannot be ruled out, so assume a change.
                    warn!(path = %watched.display(), error = %e, "configuration watcher error");
                    flag.store(true, Ordering::SeqCst);
                }
            }
        })
        .map_err(|e| ConfigError::file_watch(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::file_watch(format!("{}: {e}", dir.display())))?;

        Ok(Self {
            _watcher: Mutex::new(watcher),
            changed,
            callbacks,
            path,
        })
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once a change has been seen. The flag is never cleared;
    /// a reload replaces the watcher.
    pub fn has_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Registers a callback run on the notification thread for every change.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Arc::new(callback));
    }
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("path", &self.path)
            .field("changed", &self.has_changed())
            .finish()
    }
}
