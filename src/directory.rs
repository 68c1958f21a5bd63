//! Configuration served by a naming/directory service.

use crate::error::{ConfigError, ConfigResult};
use crate::source::Configuration;
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Failure reported by a [`DirectoryService`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectoryError {
    /// The service has no entry under the requested name.
    #[error("name not found: {0}")]
    NameNotFound(String),

    /// Any other failure, such as an unreachable service.
    #[error("{0}")]
    Failure(String),
}

/// A hierarchical name service that can be asked for one entry at a time.
pub trait DirectoryService: Send + Sync {
    /// Looks up `key` inside `namespace`.
    fn lookup(&self, namespace: &str, key: &str) -> Result<ConfigValue, DirectoryError>;
}

/// In-memory directory service keyed by `namespace/key`.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, ConfigValue>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, namespace: &str, key: &str, value: ConfigValue) -> Self {
        self.entries.insert(format!("{namespace}/{key}"), value);
        self
    }
}

impl DirectoryService for StaticDirectory {
    fn lookup(&self, namespace: &str, key: &str) -> Result<ConfigValue, DirectoryError> {
        let name = format!("{namespace}/{key}");
        self.entries
            .get(&name)
            .cloned()
            .ok_or(DirectoryError::NameNotFound(name))
    }
}

/// Configuration reading each key from a [`DirectoryService`] namespace.
///
/// A name the service does not know is an absent key. Any other failure
/// aborts the lookup with [`ConfigError::Directory`].
pub struct DirectoryConfiguration {
    service: Arc<dyn DirectoryService>,
    namespace: String,
    name: String,
}

impl DirectoryConfiguration {
    pub fn new(service: Arc<dyn DirectoryService>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            service,
            name: format!("directory '{namespace}'"),
            namespace,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Configuration for DirectoryConfiguration {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        match self.service.lookup(&self.namespace, key) {
            Ok(value) => Ok(Some(value)),
            Err(DirectoryError::NameNotFound(_)) => Ok(None),
            Err(DirectoryError::Failure(message)) => Err(ConfigError::directory(key, message)),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
