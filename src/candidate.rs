//! Discovery of the resource that backs a managed configuration.
//!
//! A [`CandidateSource`] lists possible locations in priority order. The
//! [`CandidateResolver`] walks that list and picks the first candidate that
//! exists and whose file name carries a registered format suffix. Missing
//! candidates are skipped silently; existing ones with an unknown format are
//! skipped with a warning.

use crate::error::{ConfigError, ConfigResult, ConfigResultExt};
use crate::parser::{skip_bom, FormatAdapter};
use crate::registry::FormatRegistry;
use crate::source::SharedConfig;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Upper bound on discovery passes when candidates vanish between discovery and read.
pub const MAX_DISCOVERY_PASSES: usize = 3;

/// A location that may hold a configuration document.
pub trait Candidate: Send + Sync {
    /// Name whose dotted suffixes select the format.
    fn file_name(&self) -> &str;

    fn exists(&self) -> bool;

    /// Opens the document for reading.
    fn open(&self) -> io::Result<Box<dyn BufRead + Send>>;

    /// Last modification time, if the location has one.
    fn modified(&self) -> Option<SystemTime>;

    /// Human-readable location used in errors and logs.
    fn describe(&self) -> String;

    /// Filesystem path of the candidate, if it lives on disk.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// A file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    path: PathBuf,
    file_name: String,
}

impl FileCandidate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }
}

impl Candidate for FileCandidate {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        let file = fs::File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// A document compiled into the binary, e.g. with `include_bytes!`.
#[derive(Debug, Clone)]
pub struct EmbeddedCandidate {
    name: String,
    bytes: Arc<[u8]>,
}

impl EmbeddedCandidate {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl Candidate for EmbeddedCandidate {
    fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn exists(&self) -> bool {
        true
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }

    fn modified(&self) -> Option<SystemTime> {
        None
    }

    fn describe(&self) -> String {
        format!("embedded:{}", self.name)
    }
}

/// Iterator over candidates; an item error aborts resolution.
pub type CandidateIter<'a> = Box<dyn Iterator<Item = ConfigResult<Arc<dyn Candidate>>> + 'a>;

/// Produces candidates in priority order, highest first.
pub trait CandidateSource: Send + Sync {
    /// Starts an enumeration. `registry` lets sources expand names by known suffixes.
    fn candidates<'a>(&'a self, registry: &'a FormatRegistry) -> ConfigResult<CandidateIter<'a>>;

    /// Summary used when nothing could be found.
    fn describe(&self) -> String;
}

/// A fixed, ordered list of candidates.
#[derive(Clone, Default)]
pub struct StaticCandidates {
    candidates: Vec<Arc<dyn Candidate>>,
}

impl StaticCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate with lower priority than those already added.
    pub fn with(mut self, candidate: impl Candidate + 'static) -> Self {
        self.candidates.push(Arc::new(candidate));
        self
    }

    /// Appends a file candidate.
    pub fn with_file(self, path: impl Into<PathBuf>) -> Self {
        self.with(FileCandidate::new(path))
    }
}

impl CandidateSource for StaticCandidates {
    fn candidates<'a>(&'a self, _registry: &'a FormatRegistry) -> ConfigResult<CandidateIter<'a>> {
        Ok(Box::new(self.candidates.iter().cloned().map(Ok)))
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.candidates.iter().map(|c| c.describe()).collect();
        names.join(", ")
    }
}

/// `<name>.<suffix>` in each search directory, for every registered suffix.
///
/// Directories are searched in the order they were added. With no directory
/// configured the standard locations are used: the working directory, the
/// user's `~/.config` and home directory, then system-wide directories.
#[derive(Debug, Clone)]
pub struct SearchPathCandidates {
    name: String,
    dirs: Vec<PathBuf>,
}

impl SearchPathCandidates {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirs: Vec::new(),
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if self.dirs.is_empty() {
            standard_config_dirs()
        } else {
            self.dirs.clone()
        }
    }
}

impl CandidateSource for SearchPathCandidates {
    fn candidates<'a>(&'a self, registry: &'a FormatRegistry) -> ConfigResult<CandidateIter<'a>> {
        if self.name.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }

        let suffixes = registry.suffixes();
        let iter = self.search_dirs().into_iter().flat_map(move |dir| {
            suffixes
                .clone()
                .into_iter()
                .map(move |suffix| -> ConfigResult<Arc<dyn Candidate>> {
                    Ok(Arc::new(FileCandidate::new(
                        dir.join(format!("{}.{suffix}", self.name)),
                    )))
                })
        });
        Ok(Box::new(iter))
    }

    fn describe(&self) -> String {
        let dirs: Vec<String> = self
            .search_dirs()
            .iter()
            .map(|dir| dir.display().to_string())
            .collect();
        format!("'{}' in [{}]", self.name, dirs.join(", "))
    }
}

/// Standard configuration directories for the current platform, highest priority first.
pub fn standard_config_dirs() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".")];

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".config"));
        paths.push(home_dir);
    }

    #[cfg(unix)]
    {
        paths.push(PathBuf::from("/etc"));
        paths.push(PathBuf::from("/usr/local/etc"));
    }

    #[cfg(windows)]
    {
        if let Ok(program_data) = std::env::var("PROGRAMDATA") {
            paths.push(PathBuf::from(program_data));
        }
        if let Ok(app_data) = std::env::var("APPDATA") {
            paths.push(PathBuf::from(app_data));
        }
    }

    paths
}

/// Regular files in a directory whose names match a pattern, sorted by name.
///
/// A directory that does not exist yields no candidates; other I/O errors
/// while listing are returned.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    dir: PathBuf,
    pattern: Regex,
}

impl DirectoryListing {
    pub fn new(dir: impl Into<PathBuf>, pattern: Regex) -> Self {
        Self {
            dir: dir.into(),
            pattern,
        }
    }

    /// Compiles `pattern` and lists `dir`.
    pub fn matching(dir: impl Into<PathBuf>, pattern: &str) -> ConfigResult<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ConfigError::invalid_value(format!("file name pattern: {e}")))?;
        Ok(Self::new(dir, pattern))
    }
}

impl CandidateSource for DirectoryListing {
    fn candidates<'a>(&'a self, _registry: &'a FormatRegistry) -> ConfigResult<CandidateIter<'a>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "candidate directory does not exist");
                return Ok(Box::new(std::iter::empty()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.pattern.is_match(&name) {
                matches.push((name, entry.path()));
            }
        }
        matches.sort();

        Ok(Box::new(matches.into_iter().map(
            |(_, path)| -> ConfigResult<Arc<dyn Candidate>> { Ok(Arc::new(FileCandidate::new(path))) },
        )))
    }

    fn describe(&self) -> String {
        format!("files matching /{}/ in {}", self.pattern, self.dir.display())
    }
}

type CandidateFn = dyn Fn(&FormatRegistry) -> ConfigResult<Vec<Arc<dyn Candidate>>> + Send + Sync;

/// Candidates computed by a closure on every discovery pass.
pub struct FnCandidates {
    name: String,
    f: Box<CandidateFn>,
}

impl FnCandidates {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FormatRegistry) -> ConfigResult<Vec<Arc<dyn Candidate>>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Box::new(f),
        }
    }
}

impl CandidateSource for FnCandidates {
    fn candidates<'a>(&'a self, registry: &'a FormatRegistry) -> ConfigResult<CandidateIter<'a>> {
        let candidates = (self.f)(registry)?;
        Ok(Box::new(candidates.into_iter().map(Ok)))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// The winning candidate and the format that will read it.
#[derive(Clone)]
pub struct Resolution {
    pub candidate: Arc<dyn Candidate>,
    pub suffix: String,
    pub format: Arc<dyn FormatAdapter>,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("candidate", &self.candidate.describe())
            .field("suffix", &self.suffix)
            .field("format", &self.format.name())
            .finish()
    }
}

/// A resolution together with the configuration read from it.
#[derive(Clone)]
pub struct LoadedCandidate {
    pub resolution: Resolution,
    pub config: SharedConfig,
    /// Modification time observed just before the read.
    pub modified: Option<SystemTime>,
}

/// Picks and loads the candidate that backs a configuration.
#[derive(Clone)]
pub struct CandidateResolver {
    source: Arc<dyn CandidateSource>,
    registry: Arc<FormatRegistry>,
    required: bool,
}

impl CandidateResolver {
    /// Creates a resolver in required mode.
    pub fn new(source: Arc<dyn CandidateSource>, registry: Arc<FormatRegistry>) -> Self {
        Self {
            source,
            registry,
            required: true,
        }
    }

    /// In optional mode finding nothing is `Ok(None)` rather than an error.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn source(&self) -> &Arc<dyn CandidateSource> {
        &self.source
    }

    /// Returns the first existing candidate with a registered format.
    ///
    /// # Errors
    /// * `ConfigError::NoSupportedResource` - In required mode, if nothing qualifies
    /// * Any error raised while enumerating candidates
    pub fn resolve(&self) -> ConfigResult<Option<Resolution>> {
        let mut searched = Vec::new();

        for candidate in self.source.candidates(&self.registry)? {
            let candidate = candidate?;
            let location = candidate.describe();

            if !candidate.exists() {
                debug!(candidate = %location, "configuration candidate does not exist");
                searched.push(location);
                continue;
            }

            match self.registry.adapter_for(candidate.file_name()) {
                Ok((suffix, format)) => {
                    debug!(
                        candidate = %location,
                        format = format.name(),
                        "resolved configuration candidate"
                    );
                    return Ok(Some(Resolution {
                        candidate,
                        suffix,
                        format,
                    }));
                }
                Err(e) => {
                    warn!(
                        candidate = %location,
                        error = %e,
                        "skipping configuration candidate"
                    );
                    searched.push(location);
                }
            }
        }

        if self.required {
            let searched = if searched.is_empty() {
                self.source.describe()
            } else {
                searched.join(", ")
            };
            return Err(ConfigError::no_supported_resource(searched));
        }

        debug!(source = %self.source.describe(), "no configuration candidate found");
        Ok(None)
    }

    /// Reads the resolved candidate, skipping a UTF-8 byte-order mark.
    pub fn load(&self, resolution: &Resolution) -> ConfigResult<SharedConfig> {
        let mut reader = resolution.candidate.open()?;
        skip_bom(&mut *reader)?;
        resolution
            .format
            .load(&mut *reader, &resolution.candidate.describe())
            .with_context(|| format!("reading as {}", resolution.format.name()))
    }

    /// Reads a resolution and records the modification time seen before reading.
    pub fn load_candidate(&self, resolution: Resolution) -> ConfigResult<LoadedCandidate> {
        let modified = resolution.candidate.modified();
        let config = self.load(&resolution)?;
        info!(
            candidate = %resolution.candidate.describe(),
            format = resolution.format.name(),
            "loaded configuration"
        );
        Ok(LoadedCandidate {
            resolution,
            config,
            modified,
        })
    }

    /// Resolves and loads in one step.
    ///
    /// A candidate that disappears between discovery and the read triggers a
    /// new discovery pass, up to [`MAX_DISCOVERY_PASSES`].
    pub fn resolve_and_load(&self) -> ConfigResult<Option<LoadedCandidate>> {
        for pass in 1..=MAX_DISCOVERY_PASSES {
            let Some(resolution) = self.resolve()? else {
                return Ok(None);
            };

            match self.load_candidate(resolution) {
                Ok(loaded) => return Ok(Some(loaded)),
                Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(pass, "configuration candidate vanished before it was read");
                }
                Err(e) => return Err(e),
            }
        }

        if !self.required {
            debug!(
                source = %self.source.describe(),
                "configuration candidates kept disappearing, treating as not found"
            );
            return Ok(None);
        }
        Err(ConfigError::no_supported_resource(format!(
            "{} (candidates kept disappearing after {MAX_DISCOVERY_PASSES} passes)",
            self.source.describe()
        )))
    }
}
