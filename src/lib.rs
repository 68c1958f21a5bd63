//! # confchain
//!
//! Typed configuration lookup over interchangeable backends, with fallback
//! chains, key-space views and managed, self-refreshing configurations.
//!
//! It supports:
//!
//! - Typed reads (`string`, `bool`, `i32`, `i64`, `f64`, paths, URIs,
//!   collections, nested sections) with a required (`get*`) and an optional
//!   (`find*`) variant of each
//! - Reading JSON, YAML, TOML, INI and Java-style properties documents
//! - Environment variables, property maps and directory services as backends
//! - Fallback chains where the nearest configuration wins
//! - Narrowing (sub) and widening (super) views over a key space
//! - Discovering which of several candidate files backs a configuration, and
//!   reloading it when it changes
//!
//! ## Architecture Overview
//!
//! Everything is a [`Configuration`]: a backend supplies one raw lookup and
//! gets the typed API from [`ConfigurationExt`]. Wrappers are configurations
//! too, so they stack:
//!
//! ```text
//! caller -> ManagedConfiguration -> SubConfiguration -> FallbackConfiguration
//!                                                         ├── MapConfiguration (app.yaml)
//!                                                         └── EnvConfiguration (parent)
//! ```
//!
//! An absent key is `Ok(None)`. A backend failure, a parse error or a value
//! that cannot be converted is an `Err` and is never mistaken for absence,
//! so it never falls through to a parent.
//!
//! ## Quick Start
//!
//! ```rust
//! use confchain::{chain, ConfigurationExt, ConfigValue, EnvConfiguration, MapConfiguration, SharedConfig};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let defaults = MapConfiguration::new("defaults")
//!     .with_value("database.host", ConfigValue::from("localhost"))
//!     .with_value("database.port", ConfigValue::from(5432i64));
//!
//! let env = EnvConfiguration::from_map(
//!     "env",
//!     HashMap::from([("MYAPP_DATABASE_PORT".to_string(), "6432".to_string())]),
//! )
//! .with_prefix("MYAPP");
//!
//! let config = chain([Arc::new(env) as SharedConfig, Arc::new(defaults) as SharedConfig]);
//!
//! assert_eq!(config.get_string("database.host").unwrap(), "localhost");
//! assert_eq!(config.get_i64("database.port").unwrap(), 6432);
//! assert_eq!(config.find_string("database.user").unwrap(), None);
//! ```
//!
//! ## Managed Configuration
//!
//! ```rust,no_run
//! use confchain::{ConfigurationExt, ManagedConfiguration, SearchPathCandidates};
//!
//! // Looks for config.json, config.yaml, config.yml, config.toml, config.ini and
//! // config.properties in ./configs, then /etc/myapp.
//! let config = ManagedConfiguration::builder(
//!     SearchPathCandidates::new("config")
//!         .with_dir("./configs")
//!         .with_dir("/etc/myapp"),
//! )
//! .watch_changes(true)
//! .build();
//!
//! // Loaded on first access, reloaded on the first access after the file changes.
//! let host = config.get_string("database.host").unwrap();
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use confchain::{ConfigError, ConfigurationExt, MapConfiguration};
//!
//! let config = MapConfiguration::new("empty");
//! match config.get_string("nonexistent.key") {
//!     Ok(value) => println!("Value: {}", value),
//!     Err(ConfigError::KeyNotFound { key }) => println!("Key '{}' not found", key),
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```

pub mod cache;
pub mod candidate;
pub mod chain;
pub mod context;
pub mod directory;
pub mod env_config;
pub mod error;
pub mod map_config;
pub mod parser;
pub mod registry;
pub mod source;
pub mod value;
pub mod view;
pub mod watcher;

// Re-export main types for convenience
pub use cache::{CacheState, ManagedConfiguration, ManagedConfigurationBuilder};
pub use candidate::{
    Candidate, CandidateResolver, CandidateSource, DirectoryListing, EmbeddedCandidate,
    FileCandidate, FnCandidates, Resolution, SearchPathCandidates, StaticCandidates,
};
pub use chain::{chain, FallbackConfiguration};
pub use context::{system_configuration, ConfigContext};
pub use directory::{DirectoryConfiguration, DirectoryError, DirectoryService, StaticDirectory};
pub use env_config::{EnvConfiguration, ProcessEnv, PropertySource};
pub use error::{ConfigError, ConfigResult, ConfigResultExt};
pub use map_config::MapConfiguration;
pub use parser::FormatAdapter;
pub use registry::FormatRegistry;
pub use source::{Configuration, ConfigurationExt, EmptyConfiguration, Section, SharedConfig};
pub use value::{ConfigValue, FromConfigValue};
pub use view::{
    DecoratedConfiguration, KeyDecorator, SubConfiguration, SubView, SuperConfiguration,
    SuperView,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
