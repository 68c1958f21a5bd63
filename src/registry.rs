//! Registry mapping file-name suffixes to format adapters.

use crate::error::{ConfigError, ConfigResult};
use crate::parser::{default_formats, FormatAdapter};
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered table of suffix to [`FormatAdapter`].
///
/// A file name matches a suffix when it ends with `.` followed by that suffix,
/// ignoring ASCII case. When several suffixes match, the longest one wins, so
/// `config.properties.xml` prefers `properties.xml` over `xml`. A suffix
/// registered twice resolves to its first registration.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    entries: Vec<(String, Arc<dyn FormatAdapter>)>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in JSON, YAML, TOML, INI and properties formats.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for adapter in default_formats() {
            registry.register(adapter);
        }
        registry
    }

    /// Registers `adapter` under each of its own suffixes.
    pub fn register(&mut self, adapter: Arc<dyn FormatAdapter>) -> &mut Self {
        for suffix in adapter.suffixes() {
            self.entries
                .push((suffix.to_ascii_lowercase(), Arc::clone(&adapter)));
        }
        self
    }

    /// Registers `adapter` under an explicit suffix, which may contain dots.
    pub fn register_suffix(
        &mut self,
        suffix: impl AsRef<str>,
        adapter: Arc<dyn FormatAdapter>,
    ) -> &mut Self {
        self.entries
            .push((suffix.as_ref().to_ascii_lowercase(), adapter));
        self
    }

    /// Builder form of [`FormatRegistry::register`].
    pub fn with(mut self, adapter: Arc<dyn FormatAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Returns the distinct registered suffixes in registration order.
    pub fn suffixes(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (suffix, _) in &self.entries {
            if !seen.contains(&suffix.as_str()) {
                seen.push(suffix);
            }
        }
        seen
    }

    /// Returns the adapter registered for exactly `suffix`.
    pub fn find_by_suffix(&self, suffix: &str) -> Option<Arc<dyn FormatAdapter>> {
        let suffix = suffix.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(registered, _)| *registered == suffix)
            .map(|(_, adapter)| Arc::clone(adapter))
    }

    /// Returns the longest registered suffix of `file_name` and its adapter.
    pub fn match_file_name(&self, file_name: &str) -> Option<(String, Arc<dyn FormatAdapter>)> {
        let file_name = file_name.to_ascii_lowercase();
        let mut best: Option<&(String, Arc<dyn FormatAdapter>)> = None;

        for entry in &self.entries {
            let suffix = entry.0.as_str();
            let matches = file_name
                .strip_suffix(suffix)
                .is_some_and(|stem| stem.ends_with('.'));
            if matches && best.map_or(true, |(current, _)| suffix.len() > current.len()) {
                best = Some(entry);
            }
        }

        best.map(|(suffix, adapter)| (suffix.clone(), Arc::clone(adapter)))
    }

    /// Like [`FormatRegistry::match_file_name`], but a file no adapter handles is an error.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - If no registered suffix matches `file_name`
    pub fn adapter_for(&self, file_name: &str) -> ConfigResult<(String, Arc<dyn FormatAdapter>)> {
        self.match_file_name(file_name)
            .ok_or_else(|| ConfigError::unsupported_format(file_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|(suffix, adapter)| format!("{suffix} => {}", adapter.name())),
            )
            .finish()
    }
}
