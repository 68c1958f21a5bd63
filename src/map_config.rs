//! Object-graph backed configuration.

use crate::error::ConfigResult;
use crate::source::{Configuration, Section};
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration backed by an in-memory tree of [`ConfigValue`]s.
///
/// This is what the JSON, YAML, TOML, INI and properties formats load into.
/// Lookups first try the key verbatim (so flat keys such as `db.host` from a
/// properties file resolve directly) and then walk nested objects segment by
/// segment; numeric segments index into arrays (`servers.0.port`).
///
/// Object values are exposed as sections.
#[derive(Debug, Clone)]
pub struct MapConfiguration {
    data: HashMap<String, ConfigValue>,
    source_name: String,
    separator: String,
}

impl MapConfiguration {
    /// Creates an empty map configuration.
    ///
    /// # Example
    /// ```
    /// use confchain::{Configuration, ConfigurationExt, ConfigValue, MapConfiguration};
    ///
    /// let config = MapConfiguration::new("defaults")
    ///     .with_value("database.host", ConfigValue::from("localhost"))
    ///     .with_value("database.port", ConfigValue::from(5432i64));
    ///
    /// assert_eq!(config.get_string("database.host").unwrap(), "localhost");
    /// assert!(config.find_section("database").unwrap().is_some());
    /// ```
    pub fn new(source_name: impl Into<String>) -> Self {
        Self::from_map(source_name, HashMap::new())
    }

    /// Wraps already parsed data.
    pub fn from_map(source_name: impl Into<String>, data: HashMap<String, ConfigValue>) -> Self {
        Self {
            data,
            source_name: source_name.into(),
            separator: ".".to_string(),
        }
    }

    /// Uses `separator` instead of `.` between key segments.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Adds a value under a possibly nested key, creating intermediate objects.
    pub fn with_value(mut self, key: &str, value: ConfigValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value under a possibly nested key.
    ///
    /// An intermediate key holding a non-object value is replaced by an object.
    pub fn insert(&mut self, key: &str, value: ConfigValue) {
        let parts: Vec<&str> = key.split(self.separator.as_str()).collect();
        set_nested_value(&mut self.data, &parts, value);
    }

    /// Returns the top-level data.
    pub fn data(&self) -> &HashMap<String, ConfigValue> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&ConfigValue> {
        if let Some(value) = self.data.get(key) {
            return Some(value);
        }

        let mut parts = key.split(self.separator.as_str());
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = match current {
                ConfigValue::Object(obj) => obj.get(part)?,
                ConfigValue::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl Configuration for MapConfiguration {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        Ok(self.lookup(key).cloned())
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        match self.lookup(key) {
            Some(ConfigValue::Object(obj)) => {
                let nested = MapConfiguration::from_map(
                    format!("{}[{}]", self.source_name, key),
                    obj.clone(),
                )
                .with_separator(self.separator.clone());
                Ok(Some(Section::new(key, Arc::new(nested))))
            }
            _ => Ok(None),
        }
    }

    fn source_name(&self) -> &str {
        &self.source_name
    }
}

fn set_nested_value(data: &mut HashMap<String, ConfigValue>, keys: &[&str], value: ConfigValue) {
    let Some((first, rest)) = keys.split_first() else {
        return;
    };

    if rest.is_empty() {
        data.insert(first.to_string(), value);
        return;
    }

    let entry = data
        .entry(first.to_string())
        .or_insert_with(|| ConfigValue::Object(HashMap::new()));
    if !matches!(entry, ConfigValue::Object(_)) {
        *entry = ConfigValue::Object(HashMap::new());
    }
    if let ConfigValue::Object(nested) = entry {
        set_nested_value(nested, rest, value);
    }
}
