//! Lazily loaded, self-refreshing configuration.
//!
//! A [`ManagedConfiguration`] discovers its backing resource on first access,
//! keeps the parsed result as an immutable snapshot and checks on every access
//! whether that snapshot went stale. Readers take the current snapshot without
//! locking; reloads are serialized on a mutex and publish a complete new
//! snapshot in one atomic swap, so a reader sees either the old or the new
//! configuration and never a mix.
//!
//! ```text
//!           first access            change detected / mark_stale
//!   Empty ───────────────> Loaded ─────────────────────────────> Stale
//!     ^                      ^                                      │
//!     │ invalidate           └──────────── reload ──────────────────┘
//!     └──────────────────── (from any state)
//! ```

use crate::candidate::{CandidateResolver, CandidateSource, LoadedCandidate};
use crate::chain::FallbackConfiguration;
use crate::error::{ConfigError, ConfigResult};
use crate::registry::FormatRegistry;
use crate::source::{Configuration, EmptyConfiguration, Section, SharedConfig};
use crate::value::ConfigValue;
use crate::watcher::ChangeWatcher;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`ManagedConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing loaded; the next access runs full discovery.
    Empty,
    /// A current snapshot is being served.
    Loaded,
    /// The snapshot is out of date; the next access reloads it.
    Stale,
}

struct Snapshot {
    /// What readers see: the loaded configuration chained over the parent.
    config: SharedConfig,
    /// `None` records that an optional discovery found nothing.
    loaded: Option<LoadedCandidate>,
    watcher: Option<ChangeWatcher>,
}

/// Builder for [`ManagedConfiguration`].
pub struct ManagedConfigurationBuilder {
    source: Arc<dyn CandidateSource>,
    registry: Option<FormatRegistry>,
    required: bool,
    parent: Option<SharedConfig>,
    watch_changes: bool,
}

impl ManagedConfigurationBuilder {
    /// Formats used to read candidates. Defaults to [`FormatRegistry::with_defaults`].
    pub fn registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Whether finding no candidate is an error (the default) or an empty configuration.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Configuration consulted for keys the loaded resource does not bind.
    pub fn parent(mut self, parent: SharedConfig) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Watches the loaded file for changes in addition to comparing modification times.
    pub fn watch_changes(mut self, watch: bool) -> Self {
        self.watch_changes = watch;
        self
    }

    pub fn build(self) -> ManagedConfiguration {
        let registry = Arc::new(self.registry.unwrap_or_else(FormatRegistry::with_defaults));
        let name = format!("managed {}", self.source.describe());
        let resolver = CandidateResolver::new(self.source, registry).required(self.required);

        ManagedConfiguration {
            resolver,
            parent: self.parent,
            watch_changes: self.watch_changes,
            snapshot: ArcSwapOption::empty(),
            stale: AtomicBool::new(false),
            reload_lock: Mutex::new(()),
            name,
        }
    }
}

/// A configuration backed by a discovered resource that is reloaded when it changes.
///
/// # Example
/// ```no_run
/// use confchain::{ConfigurationExt, ManagedConfiguration, SearchPathCandidates};
///
/// let config = ManagedConfiguration::builder(
///     SearchPathCandidates::new("config").with_dir("/etc/myapp").with_dir("."),
/// )
/// .required(false)
/// .build();
///
/// let port = config.find_or("server.port", 8080i64).unwrap();
/// println!("listening on {port}");
/// ```
pub struct ManagedConfiguration {
    resolver: CandidateResolver,
    parent: Option<SharedConfig>,
    watch_changes: bool,
    snapshot: ArcSwapOption<Snapshot>,
    stale: AtomicBool,
    reload_lock: Mutex<()>,
    name: String,
}

impl ManagedConfiguration {
    /// Starts building a cache over `source`.
    pub fn builder(source: impl CandidateSource + 'static) -> ManagedConfigurationBuilder {
        ManagedConfigurationBuilder {
            source: Arc::new(source),
            registry: None,
            required: true,
            parent: None,
            watch_changes: false,
        }
    }

    /// Returns the current configuration, loading or reloading it first if needed.
    ///
    /// # Errors
    /// * `ConfigError::NoSupportedResource` - If a required cache finds no candidate
    /// * Any read or parse error of the resolved candidate
    pub fn current(&self) -> ConfigResult<SharedConfig> {
        if let Some(snapshot) = self.snapshot.load_full() {
            if self.staleness(&snapshot).is_none() {
                return Ok(Arc::clone(&snapshot.config));
            }
        }
        self.refresh()
    }

    /// Reports the lifecycle state, checking the resource for changes.
    pub fn state(&self) -> CacheState {
        match self.snapshot.load_full() {
            None => CacheState::Empty,
            Some(snapshot) if self.staleness(&snapshot).is_some() => CacheState::Stale,
            Some(_) => CacheState::Loaded,
        }
    }

    /// Marks the snapshot out of date; the next access reloads it.
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Forgets the snapshot and the resolved candidate; the next access runs full discovery.
    pub fn invalidate(&self) {
        let _guard = self.reload_lock.lock();
        self.snapshot.store(None);
        self.stale.store(false, Ordering::SeqCst);
        debug!(config = %self.name, "configuration cache invalidated");
    }

    /// Reloads now and returns the new snapshot.
    pub fn reload(&self) -> ConfigResult<SharedConfig> {
        self.mark_stale();
        self.refresh()
    }

    /// Describes the candidate backing the current snapshot, if any.
    pub fn resolved_candidate(&self) -> Option<String> {
        self.snapshot.load_full().and_then(|snapshot| {
            snapshot
                .loaded
                .as_ref()
                .map(|loaded| loaded.resolution.candidate.describe())
        })
    }

    pub fn is_required(&self) -> bool {
        self.resolver.is_required()
    }

    fn staleness(&self, snapshot: &Snapshot) -> Option<&'static str> {
        if self.stale.load(Ordering::SeqCst) {
            return Some("marked stale");
        }

        // A "none found" record stays until invalidated or marked stale.
        let loaded = snapshot.loaded.as_ref()?;
        let candidate = &loaded.resolution.candidate;

        if !candidate.exists() {
            return Some("candidate no longer exists");
        }
        if candidate.modified() != loaded.modified {
            return Some("modification time changed");
        }
        if snapshot
            .watcher
            .as_ref()
            .is_some_and(ChangeWatcher::has_changed)
        {
            return Some("change notification received");
        }
        None
    }

    fn refresh(&self) -> ConfigResult<SharedConfig> {
        let _guard = self.reload_lock.lock();

        // Another thread may have reloaded while this one waited for the lock.
        let current = self.snapshot.load_full();
        if let Some(snapshot) = &current {
            match self.staleness(snapshot) {
                None => return Ok(Arc::clone(&snapshot.config)),
                Some(reason) => debug!(config = %self.name, reason, "configuration is stale"),
            }
        }
        self.stale.store(false, Ordering::SeqCst);

        let remembered = current
            .as_ref()
            .and_then(|snapshot| snapshot.loaded.as_ref())
            .map(|loaded| loaded.resolution.clone());

        let loaded = match remembered {
            Some(resolution) if resolution.candidate.exists() => {
                match self.resolver.load_candidate(resolution) {
                    Ok(loaded) => Some(loaded),
                    Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                        self.discover()?
                    }
                    Err(e) => {
                        // Keep the old snapshot but retry on the next access.
                        self.stale.store(true, Ordering::SeqCst);
                        return Err(e);
                    }
                }
            }
            _ => self.discover()?,
        };

        let snapshot = Arc::new(self.snapshot_for(loaded));
        match &snapshot.loaded {
            Some(loaded) => info!(
                config = %self.name,
                candidate = %loaded.resolution.candidate.describe(),
                "configuration (re)loaded"
            ),
            None => info!(config = %self.name, "no configuration found, serving defaults"),
        }
        let config = Arc::clone(&snapshot.config);
        self.snapshot.store(Some(snapshot));
        Ok(config)
    }

    /// Full discovery. On failure the snapshot is dropped so every access errors until a load succeeds.
    fn discover(&self) -> ConfigResult<Option<LoadedCandidate>> {
        match self.resolver.resolve_and_load() {
            Ok(loaded) => Ok(loaded),
            Err(e) => {
                self.snapshot.store(None);
                Err(e)
            }
        }
    }

    fn snapshot_for(&self, loaded: Option<LoadedCandidate>) -> Snapshot {
        let base: SharedConfig = match &loaded {
            Some(loaded) => Arc::clone(&loaded.config),
            None => Arc::new(EmptyConfiguration::named(format!(
                "{} (nothing found)",
                self.name
            ))),
        };

        let config: SharedConfig = match &self.parent {
            Some(parent) => Arc::new(FallbackConfiguration::new(base, Some(Arc::clone(parent)))),
            None => base,
        };

        let watcher = if self.watch_changes {
            loaded
                .as_ref()
                .and_then(|loaded| loaded.resolution.candidate.path())
                .and_then(|path| match ChangeWatcher::watch(path) {
                    Ok(watcher) => {
                        let name = self.name.clone();
                        watcher.on_change(move |path| {
                            debug!(config = %name, path = %path.display(), "configuration file changed");
                        });
                        Some(watcher)
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot watch configuration file");
                        None
                    }
                })
        } else {
            None
        };

        Snapshot {
            config,
            loaded,
            watcher,
        }
    }
}

impl Configuration for ManagedConfiguration {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        self.current()?.find_value(key)
    }

    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        self.current()?.has_value(key)
    }

    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        self.current()?.find_path(key)
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        self.current()?.find_section(key)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
