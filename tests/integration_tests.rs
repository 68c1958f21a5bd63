//! Integration tests for confchain
//!
//! These tests exercise backends, chains, views and managed configurations
//! working together through the public API only.

use confchain::{
    chain, ConfigContext, ConfigError, Configuration, ConfigurationExt, ConfigValue,
    DirectoryConfiguration, DirectoryError, DirectoryService, EnvConfiguration,
    FallbackConfiguration, FormatRegistry, ManagedConfiguration, MapConfiguration,
    SearchPathCandidates, SharedConfig, StaticCandidates, SubConfiguration, SuperConfiguration,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper to create a temporary configuration file
fn create_temp_config_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let config_path = dir.path().join(name);
    fs::write(&config_path, content).expect("Failed to write test config file");
    config_path
}

/// Test helper to set environment variables and clean them up
struct EnvVarGuard {
    vars: Vec<String>,
}

impl EnvVarGuard {
    fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn set(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
        self.vars.push(key.to_string());
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            env::remove_var(var);
        }
    }
}

fn shared(config: impl Configuration + 'static) -> SharedConfig {
    Arc::new(config)
}

#[test]
fn test_end_to_end_properties_discovery() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let json_path = temp_dir.path().join("config.json");
    let properties_path = create_temp_config_file(&temp_dir, "config.properties", "foo=bar\n");

    let config = ManagedConfiguration::builder(
        StaticCandidates::new()
            .with_file(&json_path)
            .with_file(&properties_path),
    )
    .build();

    assert_eq!(config.get_string("foo").unwrap(), "bar");
    assert_eq!(config.find_string("missing.key").unwrap(), None);
    assert_eq!(
        config.resolved_candidate().unwrap(),
        properties_path.display().to_string()
    );

    fs::remove_file(&properties_path).unwrap();
    config.invalidate();

    let err = config.find_string("foo").unwrap_err();
    assert!(matches!(err, ConfigError::NoSupportedResource { .. }));
}

#[test]
fn test_search_path_discovery_with_parent_chain() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    create_temp_config_file(
        &temp_dir,
        "service.yaml",
        "server:\n  port: 9090\n  host: 0.0.0.0\nlog:\n  file: logs/service.log\n",
    );

    let defaults = MapConfiguration::new("defaults")
        .with_value("server.port", ConfigValue::from(80i64))
        .with_value("server.timeout", ConfigValue::from(30i64));

    let config = ManagedConfiguration::builder(
        SearchPathCandidates::new("service").with_dir(temp_dir.path()),
    )
    .parent(shared(defaults))
    .build();

    assert_eq!(config.get_i32("server.port").unwrap(), 9090);
    assert_eq!(config.get_i64("server.timeout").unwrap(), 30);
    assert_eq!(
        config.get_path("log.file").unwrap(),
        PathBuf::from("logs/service.log")
    );

    let server = config.get_section("server").unwrap();
    assert_eq!(server.get_string("host").unwrap(), "0.0.0.0");
    // Sections come whole from the nearest configuration.
    assert_eq!(server.find_i64("timeout").unwrap(), None);
}

#[test]
fn test_environment_over_file_over_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut env_guard = EnvVarGuard::new();
    env_guard.set("CCTEST_LAYERS_DATABASE_HOST", "env-host");

    let file = create_temp_config_file(
        &temp_dir,
        "app.toml",
        "[database]\nhost = \"file-host\"\nport = 5433\n",
    );

    let defaults = MapConfiguration::new("defaults")
        .with_value("database.host", ConfigValue::from("default-host"))
        .with_value("database.port", ConfigValue::from(5432i64))
        .with_value("database.pool", ConfigValue::from(10i64));

    let managed = ManagedConfiguration::builder(StaticCandidates::new().with_file(file)).build();

    let config = chain([
        shared(EnvConfiguration::new().with_prefix("CCTEST_LAYERS")),
        shared(managed),
        shared(defaults),
    ]);

    assert_eq!(config.get_string("database.host").unwrap(), "env-host");
    assert_eq!(config.get_i64("database.port").unwrap(), 5433);
    assert_eq!(config.get_i64("database.pool").unwrap(), 10);
    assert!(config.get_string("database.user").unwrap_err().is_key_not_found());
}

#[test]
fn test_error_is_not_absence() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let broken = create_temp_config_file(&temp_dir, "broken.json", "{ \"port\": ");

    let parent = shared(MapConfiguration::new("parent").with_value("port", ConfigValue::from(1i64)));

    // Parse failure of the nearest configuration.
    let managed = ManagedConfiguration::builder(StaticCandidates::new().with_file(broken))
        .required(false)
        .build();
    let config = FallbackConfiguration::new(shared(managed), Some(Arc::clone(&parent)));
    assert!(config.find_i64("port").unwrap_err().is_parse_error());

    // Conversion failure of a present value.
    let config = chain([
        shared(MapConfiguration::new("child").with_value("port", ConfigValue::from("http"))),
        parent,
    ]);
    assert!(config.get_i64("port").unwrap_err().is_type_conversion());
}

#[test]
fn test_directory_service_not_found_vs_failure() {
    struct FlakyDirectory;

    impl DirectoryService for FlakyDirectory {
        fn lookup(&self, namespace: &str, key: &str) -> Result<ConfigValue, DirectoryError> {
            match key {
                "db.url" => Ok(ConfigValue::from(format!("{namespace}:db"))),
                "broken" => Err(DirectoryError::Failure("naming service down".to_string())),
                other => Err(DirectoryError::NameNotFound(other.to_string())),
            }
        }
    }

    let directory = shared(DirectoryConfiguration::new(Arc::new(FlakyDirectory), "env"));
    let fallback = shared(
        MapConfiguration::new("fallback")
            .with_value("pool.size", ConfigValue::from(4i64))
            .with_value("broken", ConfigValue::from("unused")),
    );
    let config = chain([directory, fallback]);

    assert_eq!(config.get_string("db.url").unwrap(), "env:db");
    assert_eq!(config.get_i64("pool.size").unwrap(), 4);
    assert!(matches!(
        config.find_string("broken").unwrap_err(),
        ConfigError::Directory { .. }
    ));
}

#[test]
fn test_views_over_loaded_configuration() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = create_temp_config_file(
        &temp_dir,
        "app.ini",
        "name = demo\n\n[database]\nhost = db.internal\nport = 5432\n",
    );

    let managed = shared(ManagedConfiguration::builder(StaticCandidates::new().with_file(file)).build());

    let database = SubConfiguration::new(Arc::clone(&managed), "database");
    assert_eq!(database.get_string("host").unwrap(), "db.internal");
    assert_eq!(database.find_string("name").unwrap(), None);

    let rooted = SuperConfiguration::new(managed, "app");
    assert_eq!(rooted.get_string("app.name").unwrap(), "demo");
    assert_eq!(rooted.get_i64("app.database.port").unwrap(), 5432);
    assert_eq!(rooted.find_string("name").unwrap(), None);
}

#[test]
fn test_custom_registry_limits_formats() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let yaml = create_temp_config_file(&temp_dir, "app.yaml", "source: yaml\n");
    let properties = create_temp_config_file(&temp_dir, "app.properties", "source=properties\n");

    let mut registry = FormatRegistry::new();
    registry.register(Arc::new(confchain::parser::PropertiesFormat));

    let config = ManagedConfiguration::builder(
        StaticCandidates::new().with_file(yaml).with_file(properties),
    )
    .registry(registry)
    .build();

    assert_eq!(config.get_string("source").unwrap(), "properties");
}

#[test]
fn test_struct_deserialization_from_file() {
    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Server {
        name: String,
        port: u16,
        #[serde(default)]
        enabled: bool,
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct App {
        name: String,
        servers: Vec<Server>,
        #[serde(default)]
        features: HashMap<String, bool>,
    }

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = create_temp_config_file(
        &temp_dir,
        "app.json",
        r#"{
            "app": {
                "name": "test-app",
                "servers": [
                    {"name": "web1", "port": 8080, "enabled": true},
                    {"name": "web2", "port": 8081}
                ],
                "features": {"auth": true}
            }
        }"#,
    );

    let config = ManagedConfiguration::builder(StaticCandidates::new().with_file(file)).build();
    let app: App = config.deserialize("app").unwrap().unwrap();

    assert_eq!(app.name, "test-app");
    assert_eq!(app.servers.len(), 2);
    assert!(!app.servers[1].enabled);
    assert_eq!(app.features.get("auth"), Some(&true));
    assert!(config.deserialize::<App>("missing").unwrap().is_none());
    assert!(matches!(
        config.deserialize::<Server>("app.name").unwrap_err(),
        ConfigError::Deserialization(_)
    ));
}

#[test]
fn test_system_context_round_trip() {
    ConfigContext::reset();
    let installed = shared(
        MapConfiguration::new("system").with_value("user.home", ConfigValue::from("/home/test")),
    );
    ConfigContext::install(installed).unwrap();

    assert_eq!(
        ConfigContext::global().get_string("user.home").unwrap(),
        "/home/test"
    );
    ConfigContext::reset();
}

#[test]
fn test_save_is_unsupported_everywhere() {
    let config = chain([
        shared(EnvConfiguration::new()),
        shared(MapConfiguration::new("map")),
    ]);
    assert!(config.save().unwrap_err().is_unsupported_operation());
}

proptest! {
    #[test]
    fn prop_sub_of_super_is_identity(
        entries in proptest::collection::hash_map("[a-c]{1,3}(\\.[a-c]{1,3}){0,2}", "[a-z0-9]{0,8}", 0..12),
        prefix in "[a-z]{1,5}",
        probe in "[a-c]{1,3}(\\.[a-c]{1,3}){0,2}",
    ) {
        let data: HashMap<String, ConfigValue> = entries
            .iter()
            .map(|(k, v)| (k.clone(), ConfigValue::from(v.as_str())))
            .collect();
        let base = shared(MapConfiguration::from_map("base", data));
        let round_trip = SubConfiguration::new(
            shared(SuperConfiguration::new(Arc::clone(&base), prefix.clone())),
            prefix,
        );

        for key in entries.keys().chain(std::iter::once(&probe)) {
            prop_assert_eq!(round_trip.find_value(key).unwrap(), base.find_value(key).unwrap());
        }
    }

    #[test]
    fn prop_super_of_sub_is_identity_under_prefix(
        entries in proptest::collection::hash_map("[a-c]{1,3}(\\.[a-c]{1,3}){0,2}", "[a-z0-9]{0,8}", 0..12),
        prefix in "[a-c]{1,3}",
        probe in "[a-c]{1,3}(\\.[a-c]{1,3}){0,2}",
    ) {
        let data: HashMap<String, ConfigValue> = entries
            .iter()
            .map(|(k, v)| (k.clone(), ConfigValue::from(v.as_str())))
            .collect();
        let base = shared(MapConfiguration::from_map("base", data));
        let round_trip = SuperConfiguration::new(
            shared(SubConfiguration::new(Arc::clone(&base), prefix.clone())),
            prefix.clone(),
        );

        let prefixed = format!("{prefix}.{probe}");
        prop_assert_eq!(
            round_trip.find_value(&prefixed).unwrap(),
            base.find_value(&prefixed).unwrap()
        );
        for key in entries.keys().filter(|k| k.starts_with(&format!("{prefix}."))) {
            prop_assert_eq!(round_trip.find_value(key).unwrap(), base.find_value(key).unwrap());
        }
    }

    #[test]
    fn prop_nearest_wins(
        child in proptest::collection::hash_map("[a-d]{1,2}", "[a-z]{1,4}", 0..6),
        parent in proptest::collection::hash_map("[a-d]{1,2}", "[a-z]{1,4}", 0..6),
        key in "[a-d]{1,2}",
    ) {
        let to_map = |name: &str, entries: &HashMap<String, String>| {
            shared(EnvConfiguration::from_map(name, entries.clone()).without_normalization())
        };
        let config = chain([to_map("child", &child), to_map("parent", &parent)]);

        let expected = child.get(&key).or_else(|| parent.get(&key)).cloned();
        prop_assert_eq!(config.find_string(&key).unwrap(), expected);
    }

    #[test]
    fn prop_longest_registered_suffix_wins(stem in "[a-z]{1,8}", upper in any::<bool>()) {
        let registry = FormatRegistry::with_defaults();
        let name = format!("{stem}.properties.yaml");
        let name = if upper { name.to_ascii_uppercase() } else { name };

        let (suffix, adapter) = registry.match_file_name(&name).unwrap();
        prop_assert_eq!(suffix, "yaml");
        prop_assert_eq!(adapter.name(), "YAML");

        let mut extended = registry.clone();
        extended.register_suffix("properties.yaml", Arc::new(confchain::parser::PropertiesFormat));
        let (suffix, adapter) = extended.match_file_name(&name).unwrap();
        prop_assert_eq!(suffix, "properties.yaml");
        prop_assert_eq!(adapter.name(), "properties");
    }
}
