//! Configuration value types and typed conversion.
//!
//! Backends hand out raw [`ConfigValue`]s. String-backed sources (environment
//! variables, property files) only ever produce [`ConfigValue::String`], which
//! is parsed here on demand; object-backed sources (JSON, YAML, TOML) may
//! produce any variant. [`FromConfigValue`] holds the conversion rules once so
//! every backend, decorator and chain shares them.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Represents a configuration value that can be of various types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Array of values
    Array(Vec<ConfigValue>),
    /// Object/map of key-value pairs
    Object(HashMap<String, ConfigValue>),
    /// Null value
    Null,
}

impl ConfigValue {
    /// Returns the value as a string reference if it's a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it's an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an f64 if it's a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the value as a bool if it's a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Checks if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Coerces the value to a string representation.
    pub fn coerce_to_string(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Boolean(b) => b.to_string(),
            ConfigValue::Array(_) => "[array]".to_string(),
            ConfigValue::Object(_) => "[object]".to_string(),
            ConfigValue::Null => "".to_string(),
        }
    }

    /// Returns the type name of the ConfigValue variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "String",
            ConfigValue::Integer(_) => "Integer",
            ConfigValue::Float(_) => "Float",
            ConfigValue::Boolean(_) => "Boolean",
            ConfigValue::Array(_) => "Array",
            ConfigValue::Object(_) => "Object",
            ConfigValue::Null => "Null",
        }
    }

    /// Converts this value into `T`, naming `key` in any conversion error.
    pub fn convert<T: FromConfigValue>(self, key: &str) -> ConfigResult<T> {
        T::from_config_value(key, self)
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(arr: Vec<ConfigValue>) -> Self {
        ConfigValue::Array(arr)
    }
}

impl From<HashMap<String, ConfigValue>> for ConfigValue {
    fn from(obj: HashMap<String, ConfigValue>) -> Self {
        ConfigValue::Object(obj)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i as i64)
    }
}

impl From<u32> for ConfigValue {
    fn from(i: u32) -> Self {
        ConfigValue::Integer(i as i64)
    }
}

impl From<Option<ConfigValue>> for ConfigValue {
    fn from(opt: Option<ConfigValue>) -> Self {
        opt.unwrap_or(ConfigValue::Null)
    }
}

/// Conversion from a raw configuration value into a typed result.
///
/// A present value that cannot be converted is a [`ConfigError::TypeConversion`],
/// never absence: callers that want a default must ask for one explicitly.
pub trait FromConfigValue: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// Converts `value`, which was found under `key`.
    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self>;
}

fn mismatch<T: FromConfigValue>(key: &str, value: &ConfigValue) -> ConfigError {
    ConfigError::type_conversion(key, value.type_name(), T::TYPE_NAME)
}

fn unparsable<T: FromConfigValue>(key: &str, raw: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::type_conversion(key, format!("String '{raw}' ({err})"), T::TYPE_NAME)
}

impl FromConfigValue for ConfigValue {
    const TYPE_NAME: &'static str = "value";

    fn from_config_value(_key: &str, value: ConfigValue) -> ConfigResult<Self> {
        Ok(value)
    }
}

impl FromConfigValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::String(s) => Ok(s),
            ConfigValue::Integer(_) | ConfigValue::Float(_) | ConfigValue::Boolean(_) => {
                Ok(value.coerce_to_string())
            }
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for bool {
    const TYPE_NAME: &'static str = "bool";

    // Strings are true only for a case-insensitive literal "true".
    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::Boolean(b) => Ok(b),
            ConfigValue::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for i64 {
    const TYPE_NAME: &'static str = "i64";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::Integer(i) => Ok(i),
            ConfigValue::Float(f)
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
            {
                Ok(f as i64)
            }
            ConfigValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| unparsable::<Self>(key, &s, e)),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        let wide = i64::from_config_value(key, value)?;
        i32::try_from(wide)
            .map_err(|_| ConfigError::type_conversion(key, format!("i64 {wide}"), Self::TYPE_NAME))
    }
}

impl FromConfigValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::Float(f) => Ok(f),
            ConfigValue::Integer(i) => Ok(i as f64),
            ConfigValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| unparsable::<Self>(key, &s, e)),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for PathBuf {
    const TYPE_NAME: &'static str = "path";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::String(s) => Ok(PathBuf::from(s)),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for http::Uri {
    const TYPE_NAME: &'static str = "URI";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::String(s) => s
                .trim()
                .parse::<http::Uri>()
                .map_err(|e| unparsable::<Self>(key, &s, e)),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for Vec<ConfigValue> {
    const TYPE_NAME: &'static str = "collection";

    // String-backed sources encode collections as comma separated items.
    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::Array(arr) => Ok(arr),
            ConfigValue::String(s) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ConfigValue::from)
                .collect()),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

impl FromConfigValue for HashMap<String, ConfigValue> {
    const TYPE_NAME: &'static str = "object";

    fn from_config_value(key: &str, value: ConfigValue) -> ConfigResult<Self> {
        match value {
            ConfigValue::Object(obj) => Ok(obj),
            other => Err(mismatch::<Self>(key, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_do_not_coerce() {
        assert_eq!(ConfigValue::from("8080").as_str(), Some("8080"));
        assert_eq!(ConfigValue::from("8080").as_i64(), None);
        assert_eq!(ConfigValue::from(3i32).as_f64(), Some(3.0));
        assert_eq!(ConfigValue::from("true").as_bool(), None);
        assert!(ConfigValue::from(None::<ConfigValue>).is_null());
    }

    #[test]
    fn test_scalars_render_as_strings() {
        assert_eq!(ConfigValue::Float(0.25).convert::<String>("k").unwrap(), "0.25");
        assert_eq!(ConfigValue::Boolean(false).convert::<String>("k").unwrap(), "false");
        assert_eq!(ConfigValue::from(7u32).convert::<String>("k").unwrap(), "7");
    }

    #[test]
    fn test_bool_from_string_literal() {
        for s in ["true", "TRUE", "True", " true "] {
            let value: bool = ConfigValue::from(s).convert("k").unwrap();
            assert!(value, "expected true for {s:?}");
        }
        // Anything other than the literal is false, not an error.
        for s in ["false", "yes", "1", "on", ""] {
            let value: bool = ConfigValue::from(s).convert("k").unwrap();
            assert!(!value, "expected false for {s:?}");
        }
        assert!(ConfigValue::Integer(1).convert::<bool>("k").is_err());
    }

    #[test]
    fn test_numeric_parsing_from_strings() {
        assert_eq!(ConfigValue::from("42").convert::<i64>("k").unwrap(), 42);
        assert_eq!(ConfigValue::from(" -7 ").convert::<i32>("k").unwrap(), -7);
        assert_eq!(ConfigValue::from("2.5").convert::<f64>("k").unwrap(), 2.5);
        assert_eq!(ConfigValue::from("1e3").convert::<f64>("k").unwrap(), 1000.0);
    }

    #[test]
    fn test_numeric_parse_failure_is_error_with_key() {
        let err = ConfigValue::from("abc")
            .convert::<i64>("server.port")
            .unwrap_err();
        assert!(err.is_type_conversion());
        assert!(err.to_string().contains("server.port"));
        assert!(err.to_string().contains("abc"));

        // Locale-specific decimal separators are not accepted.
        assert!(ConfigValue::from("2,5").convert::<f64>("k").is_err());
    }

    #[test]
    fn test_i32_range_check() {
        let err = ConfigValue::Integer(i64::from(i32::MAX) + 1)
            .convert::<i32>("k")
            .unwrap_err();
        assert!(err.is_type_conversion());
        assert_eq!(ConfigValue::Float(12.0).convert::<i32>("k").unwrap(), 12);
        assert!(ConfigValue::Float(12.5).convert::<i64>("k").is_err());

        // 2^63 is one past i64::MAX and must not saturate.
        let err = ConfigValue::Float(9_223_372_036_854_775_808.0)
            .convert::<i64>("k")
            .unwrap_err();
        assert!(err.is_type_conversion());
        assert_eq!(
            ConfigValue::Float(-9_223_372_036_854_775_808.0)
                .convert::<i64>("k")
                .unwrap(),
            i64::MIN
        );
    }

    #[test]
    fn test_string_conversion() {
        assert_eq!(
            ConfigValue::Integer(8080).convert::<String>("k").unwrap(),
            "8080"
        );
        assert!(ConfigValue::Array(vec![]).convert::<String>("k").is_err());
        assert!(ConfigValue::Null.convert::<String>("k").is_err());
    }

    #[test]
    fn test_path_and_uri_conversion() {
        let path: PathBuf = ConfigValue::from("logs/app.log").convert("k").unwrap();
        assert_eq!(path, PathBuf::from("logs/app.log"));

        let uri: http::Uri = ConfigValue::from("https://example.com:8443/api")
            .convert("k")
            .unwrap();
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port_u16(), Some(8443));

        assert!(ConfigValue::from("http://exa mple.com")
            .convert::<http::Uri>("k")
            .is_err());
    }

    #[test]
    fn test_collection_conversion() {
        let items: Vec<ConfigValue> = ConfigValue::from("a, b,,c").convert("k").unwrap();
        assert_eq!(
            items,
            vec![
                ConfigValue::from("a"),
                ConfigValue::from("b"),
                ConfigValue::from("c")
            ]
        );

        let arr = ConfigValue::Array(vec![ConfigValue::Integer(1)]);
        assert_eq!(arr.convert::<Vec<ConfigValue>>("k").unwrap().len(), 1);
        assert!(ConfigValue::Integer(1)
            .convert::<Vec<ConfigValue>>("k")
            .is_err());
    }

    #[test]
    fn test_object_conversion() {
        let mut obj = HashMap::new();
        obj.insert("key".to_string(), ConfigValue::from("value"));
        let converted: HashMap<String, ConfigValue> =
            ConfigValue::Object(obj.clone()).convert("k").unwrap();
        assert_eq!(converted, obj);
        assert!(ConfigValue::from("x")
            .convert::<HashMap<String, ConfigValue>>("k")
            .is_err());
    }

    #[test]
    fn test_conversion_error_names_both_types() {
        let err = ConfigValue::Object(HashMap::new())
            .convert::<f64>("limits")
            .unwrap_err();
        match err {
            ConfigError::TypeConversion { key, from, to } => {
                assert_eq!(key, "limits");
                assert_eq!(from, "Object");
                assert_eq!(to, f64::TYPE_NAME);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_serde_shapes() {
        let deserialized: ConfigValue = serde_json::from_str("\"test\"").unwrap();
        assert_eq!(deserialized, ConfigValue::String("test".to_string()));

        let deserialized: ConfigValue = serde_json::from_str("42").unwrap();
        assert_eq!(deserialized, ConfigValue::Integer(42));

        let deserialized: ConfigValue = serde_json::from_str("{\"key\": [1, 2]}").unwrap();
        assert!(matches!(deserialized, ConfigValue::Object(_)));

        assert_eq!(serde_json::to_string(&ConfigValue::Null).unwrap(), "null");
    }
}
