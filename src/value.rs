//! Configuration value types and conversion utilities.

use crate::deferred::Deferred;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Represents a configuration value that can be of various types.
#[derive(Debug, Clone, PartialEq)]
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
    /// Fixed-shape object accessed by attribute, such as parsed CLI arguments
    Record(Record),
    /// Value supplied after the tree is built
    Deferred(Deferred),
    /// Null value
    Null,
}

/// The kind of a [`ConfigValue`], used as the merge dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Record,
    Deferred,
    Null,
}

impl ValueKind {
    /// Returns the name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::String => "String",
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Boolean => "Boolean",
            ValueKind::Array => "Array",
            ValueKind::Object => "Object",
            ValueKind::Record => "Record",
            ValueKind::Deferred => "Deferred",
            ValueKind::Null => "Null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute-bearing object with a type name and named fields.
///
/// Unlike [`ConfigValue::Object`], records are treated as fixed-shape: path
/// traversal never creates missing fields on them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    type_name: String,
    fields: HashMap<String, ConfigValue>,
}

impl Record {
    /// Creates an empty record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: HashMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ConfigValue> {
        self.fields.get_mut(name)
    }

    /// Assigns a field, adding it if absent.
    pub fn set(&mut self, name: impl Into<String>, value: ConfigValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> &HashMap<String, ConfigValue> {
        &self.fields
    }

    pub fn into_fields(self) -> HashMap<String, ConfigValue> {
        self.fields
    }
}

impl ConfigValue {
    /// Creates an empty object.
    pub fn object() -> Self {
        ConfigValue::Object(HashMap::new())
    }

    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::String(_) => ValueKind::String,
            ConfigValue::Integer(_) => ValueKind::Integer,
            ConfigValue::Float(_) => ValueKind::Float,
            ConfigValue::Boolean(_) => ValueKind::Boolean,
            ConfigValue::Array(_) => ValueKind::Array,
            ConfigValue::Object(_) => ValueKind::Object,
            ConfigValue::Record(_) => ValueKind::Record,
            ConfigValue::Deferred(_) => ValueKind::Deferred,
            ConfigValue::Null => ValueKind::Null,
        }
    }

    /// Returns the type name of the ConfigValue variant.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

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

    /// Returns the value as an array reference if it's an array.
    pub fn as_array(&self) -> Option<&Vec<ConfigValue>> {
        match self {
            ConfigValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Returns the value as an object reference if it's an object.
    pub fn as_object(&self) -> Option<&HashMap<String, ConfigValue>> {
        match self {
            ConfigValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut HashMap<String, ConfigValue>> {
        match self {
            ConfigValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            ConfigValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Checks if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// True for values that are navigated into rather than read as leaves.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ConfigValue::Array(_) | ConfigValue::Object(_) | ConfigValue::Record(_)
        )
    }

    /// Coerces the value to a string representation.
    /// This method provides intelligent conversion from any ConfigValue type to String.
    pub fn coerce_to_string(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Boolean(b) => b.to_string(),
            ConfigValue::Array(_) => "[array]".to_string(),
            ConfigValue::Object(_) => "[object]".to_string(),
            ConfigValue::Record(record) => format!("[{}]", record.type_name()),
            ConfigValue::Deferred(deferred) => format!("[{}]", deferred.name()),
            ConfigValue::Null => "".to_string(),
        }
    }

    /// Coerces the value to a boolean representation.
    /// This method provides intelligent conversion from various ConfigValue types to bool.
    /// Returns None if the value cannot be meaningfully converted to a boolean.
    pub fn coerce_to_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
                "false" | "0" | "no" | "off" | "f" | "n" | "" => Some(false),
                _ => None,
            },
            ConfigValue::Integer(i) => Some(*i != 0),
            ConfigValue::Float(f) => Some(*f != 0.0),
            ConfigValue::Null => Some(false),
            ConfigValue::Array(arr) => Some(!arr.is_empty()),
            ConfigValue::Object(obj) => Some(!obj.is_empty()),
            ConfigValue::Record(_) => Some(true),
            ConfigValue::Deferred(_) => None,
        }
    }

    /// Coerces the value to an integer, parsing strings.
    pub fn coerce_to_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            ConfigValue::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            ConfigValue::Boolean(b) => Some(i64::from(*b)),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces the value to a float, parsing strings.
    pub fn coerce_to_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Renders values the way they appear inside path expressions.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Float(x) => write!(f, "{x:?}"),
            ConfigValue::Boolean(b) => write!(f, "{b}"),
            ConfigValue::Null => f.write_str("null"),
            ConfigValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ConfigValue::Object(obj) => {
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort();
                f.write_str("{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}': {}", key, obj[key])?;
                }
                f.write_str("}")
            }
            ConfigValue::Record(record) => {
                let mut names: Vec<&String> = record.fields.keys().collect();
                names.sort();
                write!(f, "{}(", record.type_name)?;
                for (i, name) in names.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", name, record.fields[name])?;
                }
                f.write_str(")")
            }
            ConfigValue::Deferred(deferred) => write!(f, "<deferred {}>", deferred.name()),
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::Integer(i) => serializer.serialize_i64(*i),
            ConfigValue::Float(f) => serializer.serialize_f64(*f),
            ConfigValue::Boolean(b) => serializer.serialize_bool(*b),
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Array(items) => serializer.collect_seq(items),
            ConfigValue::Object(obj) => serializer.collect_map(obj),
            ConfigValue::Record(record) => serializer.collect_map(&record.fields),
            ConfigValue::Deferred(deferred) => deferred
                .resolve()
                .map_err(<S::Error as serde::ser::Error>::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(ConfigValue::from)
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
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
                ConfigValue::Array(arr.into_iter().map(ConfigValue::from).collect())
            }
            serde_json::Value::Object(obj) => ConfigValue::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
            serde_json::Value::Null => ConfigValue::Null,
        }
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

impl From<Record> for ConfigValue {
    fn from(record: Record) -> Self {
        ConfigValue::Record(record)
    }
}

impl From<Deferred> for ConfigValue {
    fn from(deferred: Deferred) -> Self {
        ConfigValue::Deferred(deferred)
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

impl From<f32> for ConfigValue {
    fn from(f: f32) -> Self {
        ConfigValue::Float(f as f64)
    }
}

impl AsRef<ConfigValue> for ConfigValue {
    fn as_ref(&self) -> &ConfigValue {
        self
    }
}

impl From<Option<ConfigValue>> for ConfigValue {
    fn from(opt: Option<ConfigValue>) -> Self {
        opt.unwrap_or(ConfigValue::Null)
    }
}

/// Error type for ConfigValue conversion failures
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionError {
    pub from_type: String,
    pub to_type: String,
    pub value: String,
}

impl ConversionError {
    fn new(value: &ConfigValue, to_type: &str) -> Self {
        Self {
            from_type: value.type_name().to_string(),
            to_type: to_type.to_string(),
            value: value.coerce_to_string(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot convert {} value '{}' to {}",
            self.from_type, self.value, self.to_type
        )
    }
}

impl std::error::Error for ConversionError {}

impl TryFrom<ConfigValue> for String {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::String(s) => Ok(s),
            _ => Err(ConversionError::new(&value, "String")),
        }
    }
}

impl TryFrom<ConfigValue> for i64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Integer(i) => Ok(i),
            _ => Err(ConversionError::new(&value, "i64")),
        }
    }
}

impl TryFrom<ConfigValue> for f64 {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Float(f) => Ok(f),
            ConfigValue::Integer(i) => Ok(i as f64),
            _ => Err(ConversionError::new(&value, "f64")),
        }
    }
}

impl TryFrom<ConfigValue> for bool {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Boolean(b) => Ok(b),
            _ => Err(ConversionError::new(&value, "bool")),
        }
    }
}

impl TryFrom<ConfigValue> for Vec<ConfigValue> {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Array(arr) => Ok(arr),
            _ => Err(ConversionError::new(&value, "Vec<ConfigValue>")),
        }
    }
}

impl TryFrom<ConfigValue> for HashMap<String, ConfigValue> {
    type Error = ConversionError;

    fn try_from(value: ConfigValue) -> Result<Self, Self::Error> {
        match value {
            ConfigValue::Object(obj) => Ok(obj),
            _ => Err(ConversionError::new(&value, "HashMap<String, ConfigValue>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_and_type_name() {
        assert_eq!(ConfigValue::from("x").kind(), ValueKind::String);
        assert_eq!(ConfigValue::Integer(42).type_name(), "Integer");
        assert_eq!(ConfigValue::Float(3.5).type_name(), "Float");
        assert_eq!(ConfigValue::Array(vec![]).type_name(), "Array");
        assert_eq!(ConfigValue::object().type_name(), "Object");
        assert_eq!(ConfigValue::from(Record::new("args")).type_name(), "Record");
        assert_eq!(
            ConfigValue::from(Deferred::new("later")).kind(),
            ValueKind::Deferred
        );
        assert_eq!(ConfigValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(ConfigValue::from("hello").coerce_to_string(), "hello");
        assert_eq!(ConfigValue::Integer(42).coerce_to_string(), "42");
        assert_eq!(ConfigValue::Float(3.25).coerce_to_string(), "3.25");
        assert_eq!(ConfigValue::Boolean(false).coerce_to_string(), "false");
        assert_eq!(ConfigValue::Null.coerce_to_string(), "");
        assert_eq!(ConfigValue::object().coerce_to_string(), "[object]");
        assert_eq!(
            ConfigValue::from(Record::new("args")).coerce_to_string(),
            "[args]"
        );
    }

    #[test]
    fn test_coerce_to_bool() {
        for s in ["true", "TRUE", "1", "yes", "on", "t", "Y"] {
            assert_eq!(
                ConfigValue::from(s).coerce_to_bool(),
                Some(true),
                "Failed for string: {}",
                s
            );
        }
        for s in ["false", "0", "no", "OFF", "f", "n", ""] {
            assert_eq!(
                ConfigValue::from(s).coerce_to_bool(),
                Some(false),
                "Failed for string: {}",
                s
            );
        }
        assert_eq!(ConfigValue::from("maybe").coerce_to_bool(), None);
        assert_eq!(ConfigValue::Integer(0).coerce_to_bool(), Some(false));
        assert_eq!(ConfigValue::Null.coerce_to_bool(), Some(false));
        assert_eq!(ConfigValue::Array(vec![]).coerce_to_bool(), Some(false));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(ConfigValue::from(" 12 ").coerce_to_i64(), Some(12));
        assert_eq!(ConfigValue::Float(4.0).coerce_to_i64(), Some(4));
        assert_eq!(ConfigValue::Float(4.5).coerce_to_i64(), None);
        assert_eq!(ConfigValue::Float(-9.0e15).coerce_to_i64(), Some(-9_000_000_000_000_000));
        assert_eq!(ConfigValue::Float(1e20).coerce_to_i64(), None);
        assert_eq!(ConfigValue::Float(-1e20).coerce_to_i64(), None);
        assert_eq!(ConfigValue::Float(f64::INFINITY).coerce_to_i64(), None);
        assert_eq!(ConfigValue::from("x").coerce_to_i64(), None);
        assert_eq!(ConfigValue::from("2.5").coerce_to_f64(), Some(2.5));
        assert_eq!(ConfigValue::Integer(2).coerce_to_f64(), Some(2.0));
    }

    #[test]
    fn test_record_fields() {
        let mut record = Record::new("args").with_field("verbose", true);
        assert_eq!(record.type_name(), "args");
        assert!(record.contains("verbose"));
        assert!(!record.contains("quiet"));

        record.set("quiet", ConfigValue::Boolean(false));
        assert_eq!(record.get("quiet"), Some(&ConfigValue::Boolean(false)));
        assert_eq!(record.fields().len(), 2);
    }

    #[test]
    fn test_display_matches_path_rendering() {
        assert_eq!(ConfigValue::Integer(42).to_string(), "42");
        assert_eq!(ConfigValue::from("foo").to_string(), "'foo'");
        assert_eq!(ConfigValue::Float(1.0).to_string(), "1.0");
        assert_eq!(
            ConfigValue::from(json!({"b": [1, null], "a": true})).to_string(),
            "{'a': true, 'b': [1, null]}"
        );
        assert_eq!(
            ConfigValue::from(Record::new("args").with_field("x", 1i64)).to_string(),
            "args(x=1)"
        );
    }

    #[test]
    fn test_from_json_value() {
        let value = ConfigValue::from(json!({"a": {"b": [1, 2.5, "c"]}}));
        let inner = value.as_object().unwrap()["a"].as_object().unwrap()["b"].clone();
        assert_eq!(
            inner,
            ConfigValue::Array(vec![
                ConfigValue::Integer(1),
                ConfigValue::Float(2.5),
                ConfigValue::from("c"),
            ])
        );
    }

    #[test]
    fn test_try_from_conversions() {
        let converted: String = ConfigValue::from("hello").try_into().unwrap();
        assert_eq!(converted, "hello");

        let converted: f64 = ConfigValue::Integer(42).try_into().unwrap();
        assert_eq!(converted, 42.0);

        let err = String::try_from(ConfigValue::Integer(42)).unwrap_err();
        assert_eq!(err.from_type, "Integer");
        assert_eq!(err.to_type, "String");
        assert_eq!(err.value, "42");

        assert!(bool::try_from(ConfigValue::from("true")).is_err());
    }

    #[test]
    fn test_serde_round_trip_through_json() {
        let value = ConfigValue::from(json!({"name": "app", "ports": [80, 443], "debug": null}));
        let text = serde_json::to_string(&value).unwrap();
        let back: ConfigValue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_serialize_record_and_deferred() {
        let record = Record::new("args").with_field("port", 8080i64);
        let json = serde_json::to_value(ConfigValue::from(record)).unwrap();
        assert_eq!(json, json!({"port": 8080}));

        let deferred = Deferred::new("secret");
        let value = ConfigValue::from(deferred.clone());
        assert!(serde_json::to_value(&value).is_err());

        deferred.set("hunter2");
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("hunter2"));
    }
}
