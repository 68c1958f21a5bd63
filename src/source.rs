//! The configuration access contract shared by every backend, view, chain and cache.
//!
//! A backend implements [`Configuration::find_value`] and nothing else is
//! required. Typed reads live in [`ConfigurationExt`], which is implemented for
//! every configuration, so the required/optional behavior is written once:
//! `find*` returns `Ok(None)` for an absent key and `get*` turns that into
//! [`ConfigError::KeyNotFound`].

use crate::error::{ConfigError, ConfigResult};
use crate::value::{ConfigValue, FromConfigValue};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A configuration shared by reference between views, chains and caches.
pub type SharedConfig = Arc<dyn Configuration>;

/// Read access to a set of key/value bindings.
pub trait Configuration: Send + Sync {
    /// Returns the raw value bound to `key`, or `None` if the key is absent.
    ///
    /// Failures reading the backend are errors, never `None`.
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>>;

    /// Returns true if `key` has a value.
    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        Ok(self.find_value(key)?.is_some())
    }

    /// Returns the value of `key` as a path, passed through [`Configuration::resolve_path`].
    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        match self.find_value(key)? {
            Some(value) => {
                let path = self.dereference(value).convert::<PathBuf>(key)?;
                Ok(Some(self.resolve_path(path)))
            }
            None => Ok(None),
        }
    }

    /// Rebases a path read from this configuration. Identity by default.
    fn resolve_path(&self, path: PathBuf) -> PathBuf {
        path
    }

    /// Returns the nested section under `key`. Flat backends have no sections.
    fn find_section(&self, _key: &str) -> ConfigResult<Option<Section>> {
        Ok(None)
    }

    /// Human-readable name of this configuration for errors and logs.
    fn source_name(&self) -> &str;

    /// Hook for expanding references inside values. Values are returned unchanged.
    fn dereference(&self, value: ConfigValue) -> ConfigValue {
        value
    }

    /// Persisting configuration is not supported by any implementation.
    fn save(&self) -> ConfigResult<()> {
        Err(ConfigError::unsupported_operation(format!(
            "saving configuration '{}'",
            self.source_name()
        )))
    }
}

impl<C: Configuration + ?Sized> Configuration for Arc<C> {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        (**self).find_value(key)
    }

    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        (**self).has_value(key)
    }

    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        (**self).find_path(key)
    }

    fn resolve_path(&self, path: PathBuf) -> PathBuf {
        (**self).resolve_path(path)
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        (**self).find_section(key)
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }

    fn dereference(&self, value: ConfigValue) -> ConfigValue {
        (**self).dereference(value)
    }

    fn save(&self) -> ConfigResult<()> {
        (**self).save()
    }
}

/// Typed lookups available on every [`Configuration`].
pub trait ConfigurationExt: Configuration {
    /// Returns the value of `key` converted to `T`, or `None` if absent.
    ///
    /// A present value that cannot be converted is an error.
    fn find<T: FromConfigValue>(&self, key: &str) -> ConfigResult<Option<T>> {
        match self.find_value(key)? {
            Some(value) => self.dereference(value).convert(key).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the value of `key` converted to `T`.
    ///
    /// # Errors
    /// * `ConfigError::KeyNotFound` - If the key is absent
    /// * `ConfigError::TypeConversion` - If the value cannot be converted
    fn get<T: FromConfigValue>(&self, key: &str) -> ConfigResult<T> {
        self.find(key)?
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    /// Returns the value of `key`, or `default` if the key is absent.
    fn find_or<T: FromConfigValue>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.find(key)?.unwrap_or(default))
    }

    fn find_object(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        self.find(key)
    }

    fn get_object(&self, key: &str) -> ConfigResult<ConfigValue> {
        self.get(key)
    }

    fn find_string(&self, key: &str) -> ConfigResult<Option<String>> {
        self.find(key)
    }

    fn get_string(&self, key: &str) -> ConfigResult<String> {
        self.get(key)
    }

    fn find_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        self.find(key)
    }

    fn get_bool(&self, key: &str) -> ConfigResult<bool> {
        self.get(key)
    }

    fn find_i32(&self, key: &str) -> ConfigResult<Option<i32>> {
        self.find(key)
    }

    fn get_i32(&self, key: &str) -> ConfigResult<i32> {
        self.get(key)
    }

    fn find_i64(&self, key: &str) -> ConfigResult<Option<i64>> {
        self.find(key)
    }

    fn get_i64(&self, key: &str) -> ConfigResult<i64> {
        self.get(key)
    }

    fn find_f64(&self, key: &str) -> ConfigResult<Option<f64>> {
        self.find(key)
    }

    fn get_f64(&self, key: &str) -> ConfigResult<f64> {
        self.get(key)
    }

    fn find_uri(&self, key: &str) -> ConfigResult<Option<http::Uri>> {
        self.find(key)
    }

    fn get_uri(&self, key: &str) -> ConfigResult<http::Uri> {
        self.get(key)
    }

    fn find_collection(&self, key: &str) -> ConfigResult<Option<Vec<ConfigValue>>> {
        self.find(key)
    }

    fn get_collection(&self, key: &str) -> ConfigResult<Vec<ConfigValue>> {
        self.get(key)
    }

    fn find_map(&self, key: &str) -> ConfigResult<Option<HashMap<String, ConfigValue>>> {
        self.find(key)
    }

    /// Returns the path under `key`, rebased by the serving configuration.
    fn get_path(&self, key: &str) -> ConfigResult<PathBuf> {
        self.find_path(key)?
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    /// Returns the section under `key`.
    fn get_section(&self, key: &str) -> ConfigResult<Section> {
        self.find_section(key)?
            .ok_or_else(|| ConfigError::key_not_found(key))
    }

    /// Deserializes the value under `key` into `T` using serde.
    ///
    /// # Example
    /// ```
    /// use confchain::{ConfigurationExt, ConfigValue, MapConfiguration};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Database {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// let config = MapConfiguration::new("defaults")
    ///     .with_value("database.host", ConfigValue::from("localhost"))
    ///     .with_value("database.port", ConfigValue::from(5432i64));
    ///
    /// let db: Database = config.deserialize("database").unwrap().unwrap();
    /// assert_eq!(db.host, "localhost");
    /// assert_eq!(db.port, 5432);
    /// ```
    fn deserialize<T: serde::de::DeserializeOwned>(&self, key: &str) -> ConfigResult<Option<T>> {
        let Some(value) = self.find_value(key)? else {
            return Ok(None);
        };
        let json = serde_json::to_value(self.dereference(value))
            .map_err(|e| ConfigError::deserialization(format!("{key}: {e}")))?;
        serde_json::from_value(json)
            .map(Some)
            .map_err(|e| ConfigError::deserialization(format!("{key}: {e}")))
    }
}

impl<C: Configuration + ?Sized> ConfigurationExt for C {}

/// A nested scope of a configuration, optionally named and tagged with a type.
#[derive(Clone)]
pub struct Section {
    name: Option<String>,
    type_tag: Option<String>,
    config: SharedConfig,
}

impl Section {
    /// Creates a named section.
    pub fn new(name: impl Into<String>, config: SharedConfig) -> Self {
        Self {
            name: Some(name.into()),
            type_tag: None,
            config,
        }
    }

    /// Creates a section without a name.
    pub fn anonymous(config: SharedConfig) -> Self {
        Self {
            name: None,
            type_tag: None,
            config,
        }
    }

    /// Attaches a type tag to the section.
    pub fn with_type_tag(mut self, tag: impl Into<String>) -> Self {
        self.type_tag = Some(tag.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// Returns the configuration backing this section.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn into_config(self) -> SharedConfig {
        self.config
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("source", &self.config.source_name())
            .finish()
    }
}

impl Configuration for Section {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        self.config.find_value(key)
    }

    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        self.config.has_value(key)
    }

    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        self.config.find_path(key)
    }

    fn resolve_path(&self, path: PathBuf) -> PathBuf {
        self.config.resolve_path(path)
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        self.config.find_section(key)
    }

    fn source_name(&self) -> &str {
        self.config.source_name()
    }

    fn dereference(&self, value: ConfigValue) -> ConfigValue {
        self.config.dereference(value)
    }
}

/// A configuration in which every key is absent.
#[derive(Debug, Clone)]
pub struct EmptyConfiguration {
    name: String,
}

impl EmptyConfiguration {
    pub fn new() -> Self {
        Self::named("empty")
    }

    /// Creates an empty configuration reporting `name` as its source.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EmptyConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl Configuration for EmptyConfiguration {
    fn find_value(&self, _key: &str) -> ConfigResult<Option<ConfigValue>> {
        Ok(None)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
