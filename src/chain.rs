//! Fallback chaining between configurations.

use crate::error::ConfigResult;
use crate::source::{Configuration, EmptyConfiguration, Section, SharedConfig};
use crate::value::ConfigValue;
use std::path::PathBuf;
use std::sync::Arc;

/// A configuration that defers to a parent for keys its child does not bind.
///
/// The child is always asked first and the parent only sees a key when the
/// child reports it absent. Errors from the child are returned as-is and never
/// fall through to the parent. Values, sections and collections are taken
/// whole from whichever configuration answers; nothing is merged.
///
/// # Example
/// ```
/// use confchain::{ConfigurationExt, ConfigValue, FallbackConfiguration, MapConfiguration};
/// use std::sync::Arc;
///
/// let defaults = MapConfiguration::new("defaults")
///     .with_value("port", ConfigValue::from(80i64))
///     .with_value("host", ConfigValue::from("localhost"));
/// let overrides = MapConfiguration::new("overrides").with_value("port", ConfigValue::from(8080i64));
///
/// let config = FallbackConfiguration::new(Arc::new(overrides), Some(Arc::new(defaults)));
/// assert_eq!(config.get_i64("port").unwrap(), 8080);
/// assert_eq!(config.get_string("host").unwrap(), "localhost");
/// ```
#[derive(Clone)]
pub struct FallbackConfiguration {
    child: SharedConfig,
    parent: Option<SharedConfig>,
    name: String,
}

impl FallbackConfiguration {
    pub fn new(child: SharedConfig, parent: Option<SharedConfig>) -> Self {
        let name = match &parent {
            Some(parent) => format!("{} -> {}", child.source_name(), parent.source_name()),
            None => child.source_name().to_string(),
        };
        Self {
            child,
            parent,
            name,
        }
    }

    pub fn child(&self) -> &SharedConfig {
        &self.child
    }

    pub fn parent(&self) -> Option<&SharedConfig> {
        self.parent.as_ref()
    }
}

/// Links configurations nearest first: each one falls back to the next.
///
/// An empty list yields an [`EmptyConfiguration`].
pub fn chain<I>(configs: I) -> SharedConfig
where
    I: IntoIterator<Item = SharedConfig>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut configs = configs.into_iter().rev();
    let Some(farthest) = configs.next() else {
        return Arc::new(EmptyConfiguration::named("empty chain"));
    };

    configs.fold(farthest, |parent, child| -> SharedConfig {
        Arc::new(FallbackConfiguration::new(child, Some(parent)))
    })
}

impl Configuration for FallbackConfiguration {
    fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
        match self.child.find_value(key)? {
            Some(value) => Ok(Some(value)),
            None => match &self.parent {
                Some(parent) => parent.find_value(key),
                None => Ok(None),
            },
        }
    }

    fn has_value(&self, key: &str) -> ConfigResult<bool> {
        if self.child.has_value(key)? {
            return Ok(true);
        }
        match &self.parent {
            Some(parent) => parent.has_value(key),
            None => Ok(false),
        }
    }

    // Paths are rebased by whichever configuration served them.
    fn find_path(&self, key: &str) -> ConfigResult<Option<PathBuf>> {
        match self.child.find_path(key)? {
            Some(path) => Ok(Some(path)),
            None => match &self.parent {
                Some(parent) => parent.find_path(key),
                None => Ok(None),
            },
        }
    }

    fn find_section(&self, key: &str) -> ConfigResult<Option<Section>> {
        match self.child.find_section(key)? {
            Some(section) => Ok(Some(section)),
            None => match &self.parent {
                Some(parent) => parent.find_section(key),
                None => Ok(None),
            },
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::map_config::MapConfiguration;
    use crate::source::ConfigurationExt;
    use std::path::Path;

    struct FailingConfiguration;

    impl Configuration for FailingConfiguration {
        fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
            Err(ConfigError::directory(key, "backend unavailable"))
        }

        fn source_name(&self) -> &str {
            "failing"
        }
    }

    struct RootedConfiguration {
        inner: MapConfiguration,
        root: PathBuf,
    }

    impl Configuration for RootedConfiguration {
        fn find_value(&self, key: &str) -> ConfigResult<Option<ConfigValue>> {
            self.inner.find_value(key)
        }

        fn resolve_path(&self, path: PathBuf) -> PathBuf {
            self.root.join(path)
        }

        fn source_name(&self) -> &str {
            "rooted"
        }
    }

    fn map(name: &str, entries: &[(&str, &str)]) -> SharedConfig {
        let config = entries
            .iter()
            .fold(MapConfiguration::new(name), |config, (k, v)| {
                config.with_value(k, ConfigValue::from(*v))
            });
        Arc::new(config)
    }

    #[test]
    fn test_nearest_wins() {
        let config = chain(vec![
            map("nearest", &[("a", "1")]),
            map("middle", &[("a", "2"), ("b", "2")]),
            map("farthest", &[("a", "3"), ("b", "3"), ("c", "3")]),
        ]);

        assert_eq!(config.get_string("a").unwrap(), "1");
        assert_eq!(config.get_string("b").unwrap(), "2");
        assert_eq!(config.get_string("c").unwrap(), "3");
        assert_eq!(config.find_string("d").unwrap(), None);
        assert!(config.has_value("c").unwrap());
        assert!(!config.has_value("d").unwrap());
        assert_eq!(config.source_name(), "nearest -> middle -> farthest");
    }

    #[test]
    fn test_child_error_does_not_fall_through() {
        let config = FallbackConfiguration::new(
            Arc::new(FailingConfiguration),
            Some(map("parent", &[("a", "1")])),
        );

        let err = config.find_string("a").unwrap_err();
        assert!(matches!(err, ConfigError::Directory { .. }));
        assert!(config.has_value("a").is_err());
    }

    #[test]
    fn test_conversion_error_does_not_fall_through() {
        let config = chain(vec![
            map("child", &[("port", "eighty")]),
            map("parent", &[("port", "80")]),
        ]);
        assert!(config.get_i64("port").unwrap_err().is_type_conversion());
    }

    #[test]
    fn test_sections_are_not_merged() {
        let config = chain(vec![
            map("child", &[("db.host", "child-host")]),
            map("parent", &[("db.host", "parent-host"), ("db.port", "5432")]),
        ]);

        let section = config.get_section("db").unwrap();
        assert_eq!(section.get_string("host").unwrap(), "child-host");
        assert_eq!(section.find_string("port").unwrap(), None);
        // Plain lookups still fall back per key.
        assert_eq!(config.get_string("db.port").unwrap(), "5432");
    }

    #[test]
    fn test_path_rebased_by_serving_configuration() {
        let rooted = RootedConfiguration {
            inner: MapConfiguration::new("rooted").with_value("log", ConfigValue::from("app.log")),
            root: PathBuf::from("/var/app"),
        };
        let config = FallbackConfiguration::new(
            map("child", &[("data", "data.db")]),
            Some(Arc::new(rooted)),
        );

        assert_eq!(config.get_path("log").unwrap(), Path::new("/var/app/app.log"));
        assert_eq!(config.get_path("data").unwrap(), Path::new("data.db"));
    }

    #[test]
    fn test_chain_edge_cases() {
        let empty = chain(Vec::new());
        assert!(!empty.has_value("a").unwrap());

        let single = chain(vec![map("only", &[("a", "1")])]);
        assert_eq!(single.source_name(), "only");

        let orphan = FallbackConfiguration::new(map("child", &[]), None);
        assert!(orphan.parent().is_none());
        assert_eq!(orphan.find_value("a").unwrap(), None);
        assert_eq!(orphan.child().source_name(), "child");
    }
}
