//! Process-wide system configuration.
//!
//! Startup code builds the system configuration once and installs it here;
//! libraries read it back with [`ConfigContext::global`]. Nothing is installed
//! implicitly except the default on first read.

use crate::chain::chain;
use crate::env_config::EnvConfiguration;
use crate::error::{ConfigError, ConfigResult};
use crate::source::{Configuration, SharedConfig};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

static SYSTEM: RwLock<Option<SharedConfig>> = parking_lot::const_rwlock(None);

/// Builds the standard system configuration: the process environment, falling
/// back to `properties` addressed by their verbatim keys.
pub fn system_configuration(properties: HashMap<String, String>) -> SharedConfig {
    chain([
        Arc::new(EnvConfiguration::new()) as SharedConfig,
        Arc::new(EnvConfiguration::system_properties(properties)) as SharedConfig,
    ])
}

/// Holder for the process-wide system configuration.
pub struct ConfigContext;

impl ConfigContext {
    /// Installs the system configuration.
    ///
    /// # Errors
    /// * `ConfigError::InvalidValue` - If a configuration is already installed
    pub fn install(config: SharedConfig) -> ConfigResult<()> {
        let mut slot = SYSTEM.write();
        if let Some(existing) = slot.as_ref() {
            return Err(ConfigError::invalid_value(format!(
                "system configuration already installed ({})",
                existing.source_name()
            )));
        }
        debug!(source = %config.source_name(), "installing system configuration");
        *slot = Some(config);
        Ok(())
    }

    /// Returns the installed system configuration, installing the default
    /// (environment over no properties) if none was installed.
    pub fn global() -> SharedConfig {
        if let Some(config) = Self::try_global() {
            return config;
        }

        let mut slot = SYSTEM.write();
        Arc::clone(slot.get_or_insert_with(|| {
            debug!("installing default system configuration");
            system_configuration(HashMap::new())
        }))
    }

    /// Returns the installed system configuration, if any.
    pub fn try_global() -> Option<SharedConfig> {
        SYSTEM.read().clone()
    }

    /// Removes the installed configuration so another can be installed.
    pub fn reset() {
        SYSTEM.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_config::MapConfiguration;
    use crate::source::ConfigurationExt;
    use crate::value::ConfigValue;
    use parking_lot::Mutex;
    use std::env;

    // The context is process-wide; tests touching it run one at a time.
    static SERIAL: Mutex<()> = parking_lot::const_mutex(());

    #[test]
    fn test_install_once_then_reset() {
        let _serial = SERIAL.lock();
        ConfigContext::reset();

        let config: SharedConfig =
            Arc::new(MapConfiguration::new("installed").with_value("k", ConfigValue::from("v")));
        ConfigContext::install(Arc::clone(&config)).unwrap();
        assert_eq!(ConfigContext::global().get_string("k").unwrap(), "v");

        let err = ConfigContext::install(config).unwrap_err();
        assert!(err.to_string().contains("already installed"));

        ConfigContext::reset();
        assert!(ConfigContext::try_global().is_none());
    }

    #[test]
    fn test_default_is_installed_on_first_read() {
        let _serial = SERIAL.lock();
        ConfigContext::reset();

        let first = ConfigContext::global();
        let second = ConfigContext::global();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(ConfigContext::try_global().is_some());

        ConfigContext::reset();
    }

    #[test]
    fn test_environment_wins_over_properties() {
        env::set_var("CONFCHAIN_CTX_SHARED", "from-env");
        let config = system_configuration(HashMap::from([
            ("confchain.ctx.shared".to_string(), "from-props".to_string()),
            ("confchain.ctx.only".to_string(), "props-only".to_string()),
        ]));

        assert_eq!(config.get_string("confchain.ctx.shared").unwrap(), "from-env");
        assert_eq!(config.get_string("confchain.ctx.only").unwrap(), "props-only");
        env::remove_var("CONFCHAIN_CTX_SHARED");
    }
}
