//! Key-space views: narrowing a configuration to a subtree or re-rooting it under a prefix.
//!
//! Both views are the same [`DecoratedConfiguration`] with a different
//! [`KeyDecorator`]. Every lookup (value, presence, path and section) has its
//! key translated first; a key the decorator cannot translate is absent.
//!
//! ```rust
//! use confchain::{ConfigurationExt, ConfigValue, MapConfiguration, SubConfiguration, SuperConfiguration};
//! use std::sync::Arc;
//!
//! let base = Arc::new(MapConfiguration::new("base").with_value("server.port", ConfigValue::from(8080i64)));
//!
//! // Narrow: "port" means "server.port".
//! let server = SubConfiguration::new(base.clone(), "server");
//! assert_eq!(server.get_i64("port").unwrap(), 8080);
//!
//! // Widen: "app.server.port" means "server.port"; anything outside "app." is absent.
//! let app = SuperConfiguration::new(base, "app");
//! assert_eq!(app.get_i64("app.server.port").unwrap(), 8080);
//! assert_eq!(app.find_i64("server.port").unwrap(), None);
//! ```

use crate::error::ConfigResult;
use crate::source::{Configuration, Section, SharedConfig};
use crate::value::ConfigValue;
use std::path::PathBuf;

/// Translates a caller's key into the key space of the wrapped configuration.
pub trait KeyDecorator: Send + Sync {
    /// Returns the inner key for `key`, or `None` if `key` has no counterpart.
    fn decorate_key(&self, key: &str) -> Option<String>;

    /// Short description used in the view's source name.
    fn describe(&self) -> String;
}

/// Narrowing decorator: `k` becomes `prefix + separator + k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubView {
    prefix: String,
    separator: String,
}

impl SubView {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: ".".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl KeyDecorator for SubView {
    fn decorate_key(&self, key: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(key.to_string());
        }
        Some(format!("{}{}{}", self.prefix, self.separator, key))
    }

    fn describe(&self) -> String {
        format!("sub '{}'", self.prefix)
    }
}

/// Widening decorator: accepts only keys under `prefix + separator` and strips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperView {
    prefix: String,
    separator: String,
}

impl SuperView {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: ".".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl KeyDecorator for SuperView {
    fn decorate_key(&self, key: &str) -> Option<String> {
        if self.prefix.is_empty() {
            return Some(key.to_string());
        }
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(self.separator.as_str()))
            .map(str::to_string)
    }

    fn describe(&self) -> String {
        format!("super '{}'", self.prefix)
    }
}

/// A configuration whose keys pass through a [`KeyDecorator`] before reaching `inner`.
pub struct DecoratedConfiguration<D> {
    inner: SharedConfig,
    decorator: D,
    name: String,
}

/// Configuration narrowed to the subtree under a prefix.
pub type SubConfiguration = DecoratedConfiguration<SubView>;

/// Configuration re-rooted under a prefix.
pub type SuperConfiguration = DecoratedConfiguration<SuperView>;

impl<D: KeyDecorator> DecoratedConfiguration<D> {
    /// Wraps `inner` with an arbitrary decorator.
    pub fn decorate(inner: SharedConfig, decorator: D) -> Self {
        let name = format!("{} of {}", decorator.describe(), inner.source_name());
        Self {
            inner,
            decorator,
            name,
        }
    }

    pub fn inner(&self) -> &SharedConfig {
        &self.inner
    }

    pub fn decorator(&self) -> &D {
        &self.decorator
    }
}

impl DecoratedConfiguration<SubView> {
    /// Narrows `inner` to the keys under `prefix`.
    pub fn new(inner: SharedConfig, prefix: impl Into<String>) -> Self {
        Self::decorate(inner, SubView::new(prefix))
    }
}

impl DecoratedConfiguration<SuperView> {
    /// Re-roots `inner` under `prefix`.
    pub fn new(inner: SharedConfig, prefix: impl Into<String>) -> Self {
        Self::decorate(inner, SuperView::new(prefix))
    }
}

impl<D: KeyDecorator> Configuration for DecoratedConfiguration<D> {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        match self.decorator.decorate_key(key) {
            Some(inner_key) => self.inner.find_value(&inner_key),
            None => Ok(None),
        }
    }

    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        match self.decorator.decorate_key(key) {
            Some(inner_key) => self.inner.has_value(&inner_key),
            None => Ok(false),
        }
    }

    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        match self.decorator.decorate_key(key) {
            Some(inner_key) => self.inner.find_path(&inner_key),
            None => Ok(None),
        }
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        match self.decorator.decorate_key(key) {
            Some(inner_key) => self.inner.find_section(&inner_key),
            None => Ok(None),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }

    fn dereference(&self, value: ConfigValue) -> ConfigValue {
        self.inner.dereference(value)
    }
}
