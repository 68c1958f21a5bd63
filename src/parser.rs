//! Format adapters that turn a byte stream into a [`Configuration`].
//!
//! Every adapter reads from a caller-owned [`BufRead`] and never closes it.
//! Syntax problems surface as [`ConfigError::Parse`] carrying the name of the
//! resource being loaded; they are never reported as missing keys.
//!
//! ## Built-in formats
//!
//! | Adapter | Suffixes |
//! |---------|----------|
//! | [`JsonFormat`] | `json` |
//! | [`YamlFormat`] | `yaml`, `yml` |
//! | [`TomlFormat`] | `toml` |
//! | [`IniFormat`] | `ini` |
//! | [`PropertiesFormat`] | `properties` |
//!
//! ```rust
//! use confchain::parser::{FormatAdapter, PropertiesFormat};
//! use confchain::ConfigurationExt;
//!
//! let mut input = "db.host = localhost\ndb.port: 5432\n".as_bytes();
//! let config = PropertiesFormat.load(&mut input, "app.properties").unwrap();
//!
//! assert_eq!(config.get_string("db.host").unwrap(), "localhost");
//! assert_eq!(config.get_i64("db.port").unwrap(), 5432);
//! ```
//!
//! [`Configuration`]: crate::source::Configuration

use crate::error::{ConfigError, ConfigResult};
use crate::map_config::MapConfiguration;
use crate::source::SharedConfig;
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::io::{self, BufRead, Read};
use std::sync::Arc;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Loads configuration documents of one format.
///
/// # Example Implementation
///
/// ```rust
/// use confchain::parser::FormatAdapter;
/// use confchain::{ConfigResult, ConfigValue, MapConfiguration, SharedConfig};
/// use std::io::BufRead;
/// use std::sync::Arc;
///
/// struct LinesFormat;
///
/// impl FormatAdapter for LinesFormat {
///     fn name(&self) -> &str {
///         "lines"
///     }
///
///     fn suffixes(&self) -> &[&str] {
///         &["lines"]
///     }
///
///     fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
///         let mut config = MapConfiguration::new(source_name);
///         for (index, line) in reader.lines().enumerate() {
///             config.insert(&index.to_string(), ConfigValue::from(line?));
///         }
///         Ok(Arc::new(config))
///     }
/// }
/// ```
pub trait FormatAdapter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// File-name suffixes (without the leading dot) this adapter is registered under.
    fn suffixes(&self) -> &[&str];

    /// Returns true if `suffix` is one of this adapter's suffixes, ignoring ASCII case.
    fn can_handle(&self, suffix: &str) -> bool {
        self.suffixes()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(suffix))
    }

    /// Reads a whole document from `reader`.
    ///
    /// # Errors
    /// * `ConfigError::Parse` - If the document is malformed
    /// * `ConfigError::Io` - If reading the stream fails
    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig>;
}

/// Returns one instance of every built-in adapter, in registration order.
pub fn default_formats() -> Vec<Arc<dyn FormatAdapter>> {
    vec![
        Arc::new(JsonFormat),
        Arc::new(YamlFormat),
        Arc::new(TomlFormat),
        Arc::new(IniFormat),
        Arc::new(PropertiesFormat),
    ]
}

/// Consumes a leading UTF-8 byte-order mark, if present.
pub fn skip_bom(reader: &mut dyn BufRead) -> io::Result<()> {
    let has_bom = reader.fill_buf()?.starts_with(UTF8_BOM);
    if has_bom {
        reader.consume(UTF8_BOM.len());
    }
    Ok(())
}

fn read_document(reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<String> {
    let mut content = String::new();
    match reader.read_to_string(&mut content) {
        Ok(_) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(ConfigError::parse_error(
            source_name,
            "content is not valid UTF-8",
        )),
        Err(e) => Err(e.into()),
    }
}

fn into_shared(source_name: &str, data: HashMap<String, ConfigValue>) -> SharedConfig {
    Arc::new(MapConfiguration::from_map(source_name, data))
}

/// JSON documents. The root must be an object.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FormatAdapter for JsonFormat {
    fn name(&self) -> &str {
        "JSON"
    }

    fn suffixes(&self) -> &[&str] {
        &["json"]
    }

    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
        let content = read_document(reader, source_name)?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| ConfigError::parse_error(source_name, e.to_string()))?;

        match json_to_config_value(value) {
            ConfigValue::Object(data) => Ok(into_shared(source_name, data)),
            _ => Err(ConfigError::parse_error(source_name, "root must be an object")),
        }
    }
}

/// YAML documents. The root must be a mapping; an empty document is an empty configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl FormatAdapter for YamlFormat {
    fn name(&self) -> &str {
        "YAML"
    }

    fn suffixes(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
        let content = read_document(reader, source_name)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::parse_error(source_name, e.to_string()))?;

        match yaml_to_config_value(value) {
            ConfigValue::Object(data) => Ok(into_shared(source_name, data)),
            ConfigValue::Null => Ok(into_shared(source_name, HashMap::new())),
            _ => Err(ConfigError::parse_error(
                source_name,
                "root must be a mapping",
            )),
        }
    }
}

/// TOML documents. Datetimes are exposed as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl FormatAdapter for TomlFormat {
    fn name(&self) -> &str {
        "TOML"
    }

    fn suffixes(&self) -> &[&str] {
        &["toml"]
    }

    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
        let content = read_document(reader, source_name)?;
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::parse_error(source_name, e.to_string()))?;

        let data = table
            .into_iter()
            .map(|(k, v)| (k, toml_to_config_value(v)))
            .collect();
        Ok(into_shared(source_name, data))
    }
}

/// INI documents.
///
/// Keys before the first `[section]` header are top-level; each section becomes
/// an object, so `[database] host = x` is readable as `database.host`. Values
/// are typed: integers, floats, `true/yes/on`, `false/no/off`, otherwise strings
/// (surrounding double quotes are stripped).
#[derive(Debug, Clone, Copy, Default)]
pub struct IniFormat;

impl FormatAdapter for IniFormat {
    fn name(&self) -> &str {
        "INI"
    }

    fn suffixes(&self) -> &[&str] {
        &["ini"]
    }

    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
        let content = read_document(reader, source_name)?;
        let data = parse_ini_content(&content, source_name)?;
        Ok(into_shared(source_name, data))
    }
}

/// Java-style `.properties` documents.
///
/// Supports `=`, `:` and whitespace separators, `#` and `!` comments, backslash
/// line continuations and the `\t \n \r \f \uXXXX` escapes. Every value is a
/// string; keys stay flat (`a.b=c` is found under `a.b`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesFormat;

impl FormatAdapter for PropertiesFormat {
    fn name(&self) -> &str {
        "properties"
    }

    fn suffixes(&self) -> &[&str] {
        &["properties"]
    }

    fn load(&self, reader: &mut dyn BufRead, source_name: &str) -> ConfigResult<SharedConfig> {
        let content = read_document(reader, source_name)?;
        let data = parse_properties(&content, source_name)?;
        Ok(into_shared(source_name, data))
    }
}

fn parse_ini_content(
    content: &str,
    source_name: &str,
) -> ConfigResult<HashMap<String, ConfigValue>> {
    let mut result = HashMap::new();
    let mut current_section: Option<(String, HashMap<String, ConfigValue>)> = None;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if let Some((name, data)) = current_section.take() {
                result.insert(name, ConfigValue::Object(data));
            }

            let section_name = line[1..line.len() - 1].trim().to_string();
            if section_name.is_empty() {
                return Err(ConfigError::parse_error(
                    source_name,
                    format!("line {}: empty section name", index + 1),
                ));
            }
            current_section = Some((section_name, HashMap::new()));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::parse_error(
                source_name,
                format!("line {}: invalid line format: {line}", index + 1),
            ));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::parse_error(
                source_name,
                format!("line {}: empty key name", index + 1),
            ));
        }

        let parsed_value = parse_ini_value(value.trim());
        match current_section.as_mut() {
            Some((_, data)) => data.insert(key.to_string(), parsed_value),
            None => result.insert(key.to_string(), parsed_value),
        };
    }

    if let Some((name, data)) = current_section {
        result.insert(name, ConfigValue::Object(data));
    }

    Ok(result)
}

fn parse_ini_value(value: &str) -> ConfigValue {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return ConfigValue::String(value[1..value.len() - 1].to_string());
    }

    // Integers first so "0" and "1" stay numeric.
    if let Ok(i) = value.parse::<i64>() {
        return ConfigValue::Integer(i);
    }

    if let Ok(f) = value.parse::<f64>() {
        return ConfigValue::Float(f);
    }

    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => ConfigValue::Boolean(true),
        "false" | "no" | "off" => ConfigValue::Boolean(false),
        _ => ConfigValue::String(value.to_string()),
    }
}

fn parse_properties(
    content: &str,
    source_name: &str,
) -> ConfigResult<HashMap<String, ConfigValue>> {
    let mut result = HashMap::new();
    let mut logical_line = String::new();

    for line in content.lines() {
        let line = line.trim_start();

        // Continuation lines are never comments.
        if logical_line.is_empty()
            && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }

        if let Some(head) = continued(line) {
            logical_line.push_str(head);
            continue;
        }

        logical_line.push_str(line);
        insert_property(&mut result, &logical_line, source_name)?;
        logical_line.clear();
    }

    if !logical_line.is_empty() {
        insert_property(&mut result, &logical_line, source_name)?;
    }

    Ok(result)
}

/// Returns the line without its continuation backslash if it ends in an odd number of them.
fn continued(line: &str) -> Option<&str> {
    let trailing = line.bytes().rev().take_while(|b| *b == b'\\').count();
    if trailing % 2 == 1 {
        Some(&line[..line.len() - 1])
    } else {
        None
    }
}

fn insert_property(
    result: &mut HashMap<String, ConfigValue>,
    line: &str,
    source_name: &str,
) -> ConfigResult<()> {
    let (key, value) = split_property(line);
    let key = unescape(key, source_name)?;
    let value = unescape(value, source_name)?;
    result.insert(key, ConfigValue::String(value));
    Ok(())
}

fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut value = line[key_end..].trim_start();
    if let Some(stripped) = value.strip_prefix(|c| c == '=' || c == ':') {
        value = stripped.trim_start();
    }
    (key, value)
}

fn unescape(raw: &str, source_name: &str) -> ConfigResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = Some(&hex)
                    .filter(|hex| hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        ConfigError::parse_error(
                            source_name,
                            format!("invalid unicode escape '\\u{hex}'"),
                        )
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn json_to_config_value(value: serde_json::Value) -> ConfigValue {
    match value {
        serde_json::Value::String(s) => ConfigValue::String(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                ConfigValue::Float(f)
            } else {
                ConfigValue::Null
            }
        }
        serde_json::Value::Bool(b) => ConfigValue::Boolean(b),
        serde_json::Value::Array(arr) => {
            ConfigValue::Array(arr.into_iter().map(json_to_config_value).collect())
        }
        serde_json::Value::Object(obj) => ConfigValue::Object(
            obj.into_iter()
                .map(|(k, v)| (k, json_to_config_value(v)))
                .collect(),
        ),
        serde_json::Value::Null => ConfigValue::Null,
    }
}

fn yaml_to_config_value(value: serde_yaml::Value) -> ConfigValue {
    match value {
        serde_yaml::Value::String(s) => ConfigValue::String(s),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                ConfigValue::Float(f)
            } else {
                ConfigValue::Null
            }
        }
        serde_yaml::Value::Bool(b) => ConfigValue::Boolean(b),
        serde_yaml::Value::Sequence(arr) => {
            ConfigValue::Array(arr.into_iter().map(yaml_to_config_value).collect())
        }
        serde_yaml::Value::Mapping(map) => ConfigValue::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_config_value(v)))
                .collect(),
        ),
        serde_yaml::Value::Null => ConfigValue::Null,
        serde_yaml::Value::Tagged(tagged) => yaml_to_config_value(tagged.value),
    }
}

fn yaml_key_to_string(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => format!("{other:?}"),
    }
}

fn toml_to_config_value(value: toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::String(s),
        toml::Value::Integer(i) => ConfigValue::Integer(i),
        toml::Value::Float(f) => ConfigValue::Float(f),
        toml::Value::Boolean(b) => ConfigValue::Boolean(b),
        toml::Value::Array(arr) => {
            ConfigValue::Array(arr.into_iter().map(toml_to_config_value).collect())
        }
        toml::Value::Table(table) => ConfigValue::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_config_value(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
    }
}
