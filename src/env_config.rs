//! Environment variable and property-map configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::source::Configuration;
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;

/// A flat source of string properties, such as the process environment.
pub trait PropertySource: Send + Sync {
    /// Returns the property named `name`, or `None` if it is not set.
    fn property(&self, name: &str) -> ConfigResult<Option<String>>;
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl PropertySource for ProcessEnv {
    fn property(&self, name: &str) -> ConfigResult<Option<String>> {
        match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::invalid_value(format!(
                "environment variable '{name}' is not valid unicode"
            ))),
        }
    }
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, name: &str) -> ConfigResult<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

type KeyReplacer = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Configuration that reads string values from a [`PropertySource`].
///
/// By default keys are normalized the way environment variables are named:
/// `database.host` is looked up as `DATABASE_HOST`, or `APP_DATABASE_HOST`
/// with the prefix `APP`. Property maps that already use configuration keys
/// (the "system properties" of a process) disable normalization.
///
/// Values are always strings; typed reads parse them on demand.
///
/// # Example
/// ```
/// use confchain::{ConfigurationExt, EnvConfiguration};
/// use std::collections::HashMap;
///
/// let vars = HashMap::from([("APP_SERVER_PORT".to_string(), "8080".to_string())]);
/// let config = EnvConfiguration::from_map("test env", vars).with_prefix("APP");
///
/// assert_eq!(config.transform_key("server.port"), "APP_SERVER_PORT");
/// assert_eq!(config.get_i32("server.port").unwrap(), 8080);
/// ```
pub struct EnvConfiguration {
    source: Arc<dyn PropertySource>,
    prefix: Option<String>,
    key_replacer: Option<KeyReplacer>,
    normalize: bool,
    name: String,
}

impl EnvConfiguration {
    /// Reads from the process environment.
    pub fn new() -> Self {
        Self::with_source("environment variables", ProcessEnv)
    }

    /// Reads from an arbitrary property source.
    pub fn with_source(name: impl Into<String>, source: impl PropertySource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            prefix: None,
            key_replacer: None,
            normalize: true,
            name: name.into(),
        }
    }

    /// Reads from a fixed map of variables.
    pub fn from_map(name: impl Into<String>, vars: HashMap<String, String>) -> Self {
        Self::with_source(name, vars)
    }

    /// A property map addressed by configuration keys verbatim.
    pub fn system_properties(properties: HashMap<String, String>) -> Self {
        Self::from_map("system properties", properties).without_normalization()
    }

    /// Prepends `prefix` to every variable name.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Applies `replacer` after the built-in normalization.
    ///
    /// # Example
    /// ```
    /// use confchain::EnvConfiguration;
    ///
    /// let config = EnvConfiguration::new().with_key_replacer(|key| key.replace('_', "__"));
    /// assert_eq!(config.transform_key("database.host"), "DATABASE__HOST");
    /// ```
    pub fn with_key_replacer<F>(mut self, replacer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_replacer = Some(Box::new(replacer));
        self
    }

    /// Looks keys up verbatim instead of upper-casing them and replacing dots.
    pub fn without_normalization(mut self) -> Self {
        self.normalize = false;
        self
    }

    /// Returns the property name `key` is looked up under.
    pub fn transform_key(&self, key: &str) -> String {
        let mut name = if self.normalize {
            key.to_uppercase().replace('.', "_")
        } else {
            key.to_string()
        };

        if let Some(ref replacer) = self.key_replacer {
            name = replacer(&name);
        }

        match (&self.prefix, self.normalize) {
            (Some(prefix), true) => format!("{prefix}_{name}"),
            (Some(prefix), false) => format!("{prefix}.{name}"),
            (None, _) => name,
        }
    }
}

impl Default for EnvConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfiguration")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("normalize", &self.normalize)
            .field("key_replacer", &self.key_replacer.is_some())
            .finish()
    }
}

impl Configuration for EnvConfiguration {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        let name = self.transform_key(key);
        Ok(self.source.property(&name)?.map(ConfigValue::String))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
