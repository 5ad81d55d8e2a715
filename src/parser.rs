//! Configuration format parsers.
//!
//! Each parser turns text into a [`ConfigValue`] tree and back. The root may be
//! any shape: a mapping, a sequence, or a scalar.
//!
//! ## Supported Formats
//!
//! - **JSON** (`json`)
//! - **YAML** (`yaml`, `yml`)
//! - **TOML** (`toml`)
//! - **INI** (`ini`), sections become nested mappings
//!
//! ## Parser Lookup
//!
//! Parsers are looked up by file extension through a [`Parsers`] registry,
//! which can be extended with custom formats:
//!
//! ```rust
//! use strata::parser::{JsonParser, Parsers};
//!
//! let mut parsers = Parsers::default();
//! assert_eq!(parsers.get("yml").unwrap().name(), "YAML");
//! assert!(parsers.get("lolwut").is_err());
//!
//! parsers.register("conf", JsonParser);
//! assert_eq!(parsers.get("conf").unwrap().name(), "JSON");
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use strata::parser::{ConfigParser, JsonParser};
//! use strata::ConfigError;
//!
//! match JsonParser.parse(r#"{"invalid": json}"#) {
//!     Err(ConfigError::Parse { source_name, .. }) => assert_eq!(source_name, "JSON"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns configuration text into a [`ConfigValue`] tree and back.
///
/// # Example Implementation
///
/// ```rust
/// use strata::parser::ConfigParser;
/// use strata::{ConfigResult, ConfigValue};
///
/// /// One `key value` pair per line.
/// struct LineParser;
///
/// impl ConfigParser for LineParser {
///     fn parse(&self, content: &str) -> ConfigResult<ConfigValue> {
///         let map = content
///             .lines()
///             .filter_map(|line| line.split_once(' '))
///             .map(|(k, v)| (k.to_string(), ConfigValue::from(v)))
///             .collect();
///         Ok(ConfigValue::Object(map))
///     }
///
///     fn serialize(&self, data: &ConfigValue) -> ConfigResult<String> {
///         Ok(data.coerce_to_string())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["lines"]
///     }
///
///     fn name(&self) -> &str {
///         "Lines"
///     }
/// }
///
/// let parsed = LineParser.parse("host localhost\nport 80").unwrap();
/// assert_eq!(parsed.as_object().unwrap()["port"], ConfigValue::from("80"));
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses configuration text.
    ///
    /// # Errors
    /// * `ConfigError::Parse` - If the content cannot be parsed due to syntax errors
    fn parse(&self, content: &str) -> ConfigResult<ConfigValue>;

    /// Serializes a tree back into this format.
    ///
    /// # Errors
    /// * `ConfigError::Serialization` - If the tree cannot be expressed in this format
    /// * `ConfigError::NotConfigured` - If the tree holds an unset deferred value
    fn serialize(&self, data: &ConfigValue) -> ConfigResult<String>;

    /// File extensions this parser handles, without the leading dot.
    fn supported_extensions(&self) -> &[&str];

    /// Human-readable format name used in error messages.
    fn name(&self) -> &str;
}

/// Parsers keyed by file extension.
#[derive(Clone)]
pub struct Parsers {
    by_extension: HashMap<String, Arc<dyn ConfigParser>>,
}

impl Parsers {
    /// A registry with no parsers.
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registers `parser` for `extension` (case-insensitive, no leading dot).
    pub fn register(&mut self, extension: &str, parser: impl ConfigParser + 'static) {
        self.register_shared(extension, Arc::new(parser));
    }

    pub fn register_shared(&mut self, extension: &str, parser: Arc<dyn ConfigParser>) {
        self.by_extension
            .insert(normalize_extension(extension), parser);
    }

    /// Registers `parser` under every extension it reports.
    pub fn register_all(&mut self, parser: impl ConfigParser + 'static) {
        let parser: Arc<dyn ConfigParser> = Arc::new(parser);
        for extension in parser.supported_extensions() {
            self.register_shared(extension, Arc::clone(&parser));
        }
    }

    /// Looks up the parser for `extension`.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - "No parser found for 'ext'"
    pub fn get(&self, extension: &str) -> ConfigResult<Arc<dyn ConfigParser>> {
        self.by_extension
            .get(&normalize_extension(extension))
            .cloned()
            .ok_or_else(|| ConfigError::unsupported_format(format!("'{extension}'")))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl Default for Parsers {
    fn default() -> Self {
        let mut parsers = Self::empty();
        parsers.register_all(JsonParser);
        parsers.register_all(YamlParser);
        parsers.register_all(TomlParser);
        parsers.register_all(IniParser);
        parsers
    }
}

impl fmt::Debug for Parsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parsers")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Returns the built-in parser for `extension`.
///
/// # Example
/// ```
/// use strata::parser::detect_parser_by_extension;
///
/// assert_eq!(detect_parser_by_extension("yml").unwrap().name(), "YAML");
/// assert!(detect_parser_by_extension("unknown").is_err());
/// ```
pub fn detect_parser_by_extension(extension: &str) -> ConfigResult<Arc<dyn ConfigParser>> {
    Parsers::default().get(extension)
}

/// JSON configuration parser.
///
/// # Example
/// ```rust
/// use strata::parser::{ConfigParser, JsonParser};
///
/// let parsed = JsonParser.parse(r#"{"database": {"port": 5432}, "features": ["auth"]}"#).unwrap();
/// assert!(parsed.as_object().unwrap().contains_key("database"));
/// ```
pub struct JsonParser;

impl ConfigParser for JsonParser {
    fn parse(&self, content: &str) -> ConfigResult<ConfigValue> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse_error("JSON", e.to_string()))?;
        Ok(ConfigValue::from(value))
    }

    fn serialize(&self, data: &ConfigValue) -> ConfigResult<String> {
        check_deferred(data)?;
        serde_json::to_string_pretty(data).map_err(|e| ConfigError::serialization(e.to_string()))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "JSON"
    }
}

/// YAML configuration parser.
///
/// An empty document parses to an empty mapping.
///
/// # Example
/// ```rust
/// use strata::parser::{ConfigParser, YamlParser};
///
/// let parsed = YamlParser.parse("database:\n  host: localhost\nfeatures:\n  - auth\n").unwrap();
/// assert!(parsed.as_object().unwrap().contains_key("features"));
/// ```
pub struct YamlParser;

impl ConfigParser for YamlParser {
    fn parse(&self, content: &str) -> ConfigResult<ConfigValue> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse_error("YAML", e.to_string()))?;
        Ok(match yaml_to_config_value(value) {
            ConfigValue::Null => ConfigValue::object(),
            other => other,
        })
    }

    fn serialize(&self, data: &ConfigValue) -> ConfigResult<String> {
        check_deferred(data)?;
        serde_yaml::to_string(data).map_err(|e| ConfigError::serialization(e.to_string()))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn name(&self) -> &str {
        "YAML"
    }
}

/// TOML configuration parser. Datetimes are read as strings.
pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn parse(&self, content: &str) -> ConfigResult<ConfigValue> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::parse_error("TOML", e.to_string()))?;
        Ok(toml_to_config_value(toml::Value::Table(table)))
    }

    fn serialize(&self, data: &ConfigValue) -> ConfigResult<String> {
        match config_value_to_toml(data)? {
            toml::Value::Table(table) => {
                toml::to_string_pretty(&table).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            _ => Err(ConfigError::serialization("TOML root must be a table")),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn name(&self) -> &str {
        "TOML"
    }
}

/// INI configuration parser.
///
/// Keys before the first section land at the root; each `[section]` becomes a
/// nested mapping. Values are typed where they look like numbers or booleans.
///
/// # Example
/// ```rust
/// use strata::parser::{ConfigParser, IniParser};
/// use strata::ConfigValue;
///
/// let parsed = IniParser.parse("debug = true\n[database]\nport = 5432\n").unwrap();
/// let root = parsed.as_object().unwrap();
/// assert_eq!(root["debug"], ConfigValue::Boolean(true));
/// assert_eq!(root["database"].as_object().unwrap()["port"], ConfigValue::Integer(5432));
/// ```
pub struct IniParser;

impl ConfigParser for IniParser {
    fn parse(&self, content: &str) -> ConfigResult<ConfigValue> {
        parse_ini_content(content).map(ConfigValue::Object)
    }

    fn serialize(&self, data: &ConfigValue) -> ConfigResult<String> {
        match data {
            ConfigValue::Object(map) => serialize_ini_data(map),
            other => Err(ConfigError::serialization(format!(
                "INI root must be an object, not {}",
                other.type_name()
            ))),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["ini"]
    }

    fn name(&self) -> &str {
        "INI"
    }
}

/// Fails on the first unset deferred value in `data`.
fn check_deferred(data: &ConfigValue) -> ConfigResult<()> {
    match data {
        ConfigValue::Deferred(deferred) => check_deferred(&deferred.resolve()?),
        ConfigValue::Array(items) => items.iter().try_for_each(check_deferred),
        ConfigValue::Object(map) => map.values().try_for_each(check_deferred),
        ConfigValue::Record(record) => record.fields().values().try_for_each(check_deferred),
        _ => Ok(()),
    }
}

fn parse_ini_content(content: &str) -> ConfigResult<HashMap<String, ConfigValue>> {
    let mut result = HashMap::new();
    let mut current_section: Option<String> = None;
    let mut current_section_data = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if let Some(section_name) = current_section.take() {
                result.insert(
                    section_name,
                    ConfigValue::Object(std::mem::take(&mut current_section_data)),
                );
            }

            let section_name = line[1..line.len() - 1].trim().to_string();
            if section_name.is_empty() {
                return Err(ConfigError::parse_error("INI", "Empty section name"));
            }
            current_section = Some(section_name);
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::parse_error(
                "INI",
                format!("Invalid line format: {line}"),
            ));
        };
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(ConfigError::parse_error("INI", "Empty key name"));
        }

        let parsed_value = parse_ini_value(value.trim());
        if current_section.is_some() {
            current_section_data.insert(key, parsed_value);
        } else {
            result.insert(key, parsed_value);
        }
    }

    if let Some(section_name) = current_section {
        result.insert(section_name, ConfigValue::Object(current_section_data));
    }

    Ok(result)
}

fn serialize_ini_data(data: &HashMap<String, ConfigValue>) -> ConfigResult<String> {
    let mut output = String::new();

    let mut general_properties = Vec::new();
    let mut sections = Vec::new();
    for (key, value) in data {
        match value {
            ConfigValue::Object(obj) => sections.push((key, obj)),
            _ => general_properties.push((key, value)),
        }
    }
    general_properties.sort_by(|a, b| a.0.cmp(b.0));
    sections.sort_by(|a, b| a.0.cmp(b.0));

    let has_general_properties = !general_properties.is_empty();
    for (key, value) in general_properties {
        output.push_str(&format!("{} = {}\n", key, config_value_to_ini_string(value)?));
    }

    if has_general_properties && !sections.is_empty() {
        output.push('\n');
    }

    for (i, (section_name, section_obj)) in sections.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("[{section_name}]\n"));

        let mut entries: Vec<_> = section_obj.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in entries {
            output.push_str(&format!("{} = {}\n", key, config_value_to_ini_string(value)?));
        }
    }

    Ok(output)
}

fn parse_ini_value(value: &str) -> ConfigValue {
    // integers before booleans so "0" and "1" stay numbers
    if let Ok(i) = value.parse::<i64>() {
        return ConfigValue::Integer(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return ConfigValue::Float(f);
    }
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" => return ConfigValue::Boolean(true),
        "false" | "no" | "off" => return ConfigValue::Boolean(false),
        _ => {}
    }
    ConfigValue::String(value.to_string())
}

fn config_value_to_ini_string(value: &ConfigValue) -> ConfigResult<String> {
    match value {
        ConfigValue::Deferred(deferred) => config_value_to_ini_string(&deferred.resolve()?),
        ConfigValue::Array(_) | ConfigValue::Object(_) | ConfigValue::Record(_) => Err(
            ConfigError::serialization(format!("INI cannot hold nested {}", value.type_name())),
        ),
        scalar => Ok(scalar.coerce_to_string()),
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

fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    match key {
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

fn config_value_to_toml(value: &ConfigValue) -> ConfigResult<toml::Value> {
    Ok(match value {
        ConfigValue::String(s) => toml::Value::String(s.clone()),
        ConfigValue::Integer(i) => toml::Value::Integer(*i),
        ConfigValue::Float(f) => toml::Value::Float(*f),
        ConfigValue::Boolean(b) => toml::Value::Boolean(*b),
        ConfigValue::Array(arr) => toml::Value::Array(
            arr.iter()
                .map(config_value_to_toml)
                .collect::<ConfigResult<_>>()?,
        ),
        ConfigValue::Object(obj) => toml::Value::Table(toml_table(obj)?),
        ConfigValue::Record(record) => toml::Value::Table(toml_table(record.fields())?),
        ConfigValue::Deferred(deferred) => config_value_to_toml(&deferred.resolve()?)?,
        // TOML has no null
        ConfigValue::Null => toml::Value::String(String::new()),
    })
}

fn toml_table(map: &HashMap<String, ConfigValue>) -> ConfigResult<toml::Table> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), config_value_to_toml(v)?)))
        .collect()
}
