//! Path expressions: immutable, chainable descriptions of a location in a tree.
//!
//! A [`Path`] is built by chaining operations onto one of the two roots,
//! [`source()`] and [`target()`]. Nothing is evaluated when a path is built;
//! see [`crate::resolve::load`] and [`crate::resolve::store`] for evaluation.
//!
//! ```rust
//! use strata::path::{convert, required, source, target, Converter};
//!
//! let from = required(convert(source().item("foo").attr("y"), Converter::integer()));
//! assert_eq!(from.to_string(), "required(convert(source['foo'].y, integer))");
//!
//! let to = target().item("servers").insert(0).append().merge();
//! assert_eq!(to.to_string(), "target['servers'].insert(0).append().merge()");
//! ```
//!
//! Strings are sugar for dotted text paths and integers for a single index:
//!
//! ```rust
//! use strata::path::IntoPath;
//!
//! assert_eq!("a.b.c".into_path().to_string(), "a.b.c");
//! assert_eq!(2.into_path().to_string(), "[2]");
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::value::ConfigValue;
use std::fmt;
use std::sync::Arc;

/// A key used by [`Operation::Item`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Mapping key
    Name(String),
    /// Sequence index; negative values count from the end
    Index(i64),
}

impl Key {
    /// The form this key takes as a mapping key.
    pub fn as_mapping_key(&self) -> String {
        match self {
            Key::Name(name) => name.clone(),
            Key::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "'{name}'"),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<i64> for Key {
    fn from(index: i64) -> Self {
        Key::Index(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        Key::Index(i64::from(index))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index as i64)
    }
}

type ConvertFn = dyn Fn(ConfigValue) -> ConfigResult<ConfigValue> + Send + Sync;

/// A named conversion applied to a value while it is loaded.
#[derive(Clone)]
pub struct Converter {
    name: String,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Wraps a conversion function. The name is only used when rendering paths.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(ConfigValue) -> ConfigResult<ConfigValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: ConfigValue) -> ConfigResult<ConfigValue> {
        (self.func)(value)
    }

    /// Parses strings and narrows numbers to an integer.
    pub fn integer() -> Self {
        Self::new("integer", |value| {
            value
                .coerce_to_i64()
                .map(ConfigValue::Integer)
                .ok_or_else(|| ConfigError::type_conversion(value.type_name(), "Integer"))
        })
    }

    /// Parses strings and widens integers to a float.
    pub fn float() -> Self {
        Self::new("float", |value| {
            value
                .coerce_to_f64()
                .map(ConfigValue::Float)
                .ok_or_else(|| ConfigError::type_conversion(value.type_name(), "Float"))
        })
    }

    /// Accepts the usual spellings of true and false ("yes", "off", "1", ...).
    pub fn boolean() -> Self {
        Self::new("boolean", |value| {
            value
                .coerce_to_bool()
                .map(ConfigValue::Boolean)
                .ok_or_else(|| ConfigError::type_conversion(value.type_name(), "Boolean"))
        })
    }

    pub fn string() -> Self {
        Self::new("string", |value| Ok(ConfigValue::String(value.coerce_to_string())))
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("name", &self.name).finish()
    }
}

/// One step of a [`Path`].
#[derive(Debug, Clone)]
pub enum Operation {
    /// Index or key lookup
    Item(Key),
    /// Attribute lookup on a record
    Attr(String),
    /// Dotted-string segment: item lookup with attribute fallback
    Text(String),
    /// Apply a function to the value read so far
    Convert(Converter),
    /// Fail when the value read so far is absent
    Required,
    /// Treat any of these values as absent
    IfSupplied(Vec<ConfigValue>),
    /// Ignore the input and produce this value
    Literal(ConfigValue),
    /// Insert into a sequence at this index
    Insert(i64),
    /// Append to a sequence
    Append,
    /// Merge into the existing value; must be last
    Merge,
}

impl Operation {
    /// Short name used in usage errors.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Operation::Item(_) => "item",
            Operation::Attr(_) => "attribute",
            Operation::Text(_) => "text",
            Operation::Convert(_) => "convert()",
            Operation::Required => "required()",
            Operation::IfSupplied(_) => "if_supplied()",
            Operation::Literal(_) => "value()",
            Operation::Insert(_) => "insert()",
            Operation::Append => "append()",
            Operation::Merge => "merge()",
        }
    }

    /// Renders this operation applied to the rendering of the path before it.
    fn render(&self, base: &str) -> String {
        match self {
            Operation::Item(key) => format!("{base}[{key}]"),
            Operation::Attr(name) => format!("{base}.{name}"),
            Operation::Text(name) if base.is_empty() => name.clone(),
            Operation::Text(name) => format!("{base}.{name}"),
            Operation::Convert(converter) => format!("convert({base}, {})", converter.name()),
            Operation::Required => format!("required({base})"),
            Operation::IfSupplied(_) => format!("if_supplied({base})"),
            Operation::Literal(value) => format!("value({value})"),
            Operation::Insert(index) => format!("{base}.insert({index})"),
            Operation::Append => format!("{base}.append()"),
            Operation::Merge => format!("{base}.merge()"),
        }
    }
}

/// An immutable sequence of [`Operation`]s.
///
/// Every builder method returns a new path; the receiver is left untouched.
/// A path with no operations denotes the whole value.
#[derive(Clone)]
pub struct Path {
    name: String,
    ops: Vec<Operation>,
}

impl Path {
    /// Creates an empty path. The name only affects rendering.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    /// Builds a path of text segments by splitting on `.`.
    pub fn from_text(text: &str) -> Self {
        Self {
            name: String::new(),
            ops: text
                .split('.')
                .map(|part| Operation::Text(part.to_string()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns a new path with `op` appended.
    pub fn extend(&self, op: Operation) -> Self {
        let mut ops = self.ops.clone();
        ops.push(op);
        Self {
            name: self.name.clone(),
            ops,
        }
    }

    /// Key or index lookup.
    pub fn item(&self, key: impl Into<Key>) -> Self {
        self.extend(Operation::Item(key.into()))
    }

    /// Attribute lookup. Any name is accepted, including `merge` or `insert`.
    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.extend(Operation::Attr(name.into()))
    }

    /// A single dotted-path segment.
    pub fn text(&self, name: impl Into<String>) -> Self {
        self.extend(Operation::Text(name.into()))
    }

    pub fn insert(&self, index: i64) -> Self {
        self.extend(Operation::Insert(index))
    }

    pub fn append(&self) -> Self {
        self.extend(Operation::Append)
    }

    /// Merge the stored value into whatever is already there.
    pub fn merge(&self) -> Self {
        self.extend(Operation::Merge)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .ops
            .iter()
            .fold(self.name.clone(), |base, op| op.render(&base));
        f.write_str(&rendered)
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path:{self}")
    }
}

/// Conversion into a [`Path`] wherever a path is expected.
pub trait IntoPath {
    fn into_path(self) -> Path;
}

impl IntoPath for Path {
    fn into_path(self) -> Path {
        self
    }
}

impl IntoPath for &Path {
    fn into_path(self) -> Path {
        self.clone()
    }
}

impl IntoPath for &str {
    fn into_path(self) -> Path {
        Path::from_text(self)
    }
}

impl IntoPath for String {
    fn into_path(self) -> Path {
        Path::from_text(&self)
    }
}

impl IntoPath for &String {
    fn into_path(self) -> Path {
        Path::from_text(self)
    }
}

impl IntoPath for i64 {
    fn into_path(self) -> Path {
        Path::new("").item(self)
    }
}

impl IntoPath for i32 {
    fn into_path(self) -> Path {
        Path::new("").item(self)
    }
}

impl IntoPath for usize {
    fn into_path(self) -> Path {
        Path::new("").item(self)
    }
}

/// The root for paths that read from incoming data.
pub fn source() -> Path {
    Path::new("source")
}

/// The root for paths that write into the configuration.
pub fn target() -> Path {
    Path::new("target")
}

/// Applies `converter` to the value found at `path`.
pub fn convert(path: impl IntoPath, converter: Converter) -> Path {
    path.into_path().extend(Operation::Convert(converter))
}

/// Fails loudly if nothing is found at `path`.
pub fn required(path: impl IntoPath) -> Path {
    path.into_path().extend(Operation::Required)
}

/// Treats null and empty strings at `path` as absent.
pub fn if_supplied(path: impl IntoPath) -> Path {
    path.into_path()
        .extend(Operation::IfSupplied(default_false_values()))
}

/// Treats any of `false_values` at `path` as absent.
pub fn if_supplied_with<I, V>(path: impl IntoPath, false_values: I) -> Path
where
    I: IntoIterator<Item = V>,
    V: Into<ConfigValue>,
{
    path.into_path().extend(Operation::IfSupplied(
        false_values.into_iter().map(Into::into).collect(),
    ))
}

/// A path that always yields `value`.
pub fn value(value: impl Into<ConfigValue>) -> Path {
    Path::new("").extend(Operation::Literal(value.into()))
}

/// The values [`if_supplied`] treats as absent.
pub fn default_false_values() -> Vec<ConfigValue> {
    vec![ConfigValue::Null, ConfigValue::String(String::new())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots() {
        assert_eq!(source().to_string(), "source");
        assert_eq!(target().to_string(), "target");
        assert_eq!(format!("{:?}", source()), "Path:source");
        assert_eq!(format!("{:?}", target()), "Path:target");
        assert!(source().is_empty());
    }

    #[test]
    fn test_nested_rendering() {
        let path = required(convert(source().item("foo").attr("y"), Converter::integer()))
            .insert(0)
            .append()
            .merge();
        assert_eq!(
            path.to_string(),
            "required(convert(source['foo'].y, integer)).insert(0).append().merge()"
        );
        assert_eq!(
            format!("{path:?}"),
            "Path:required(convert(source['foo'].y, integer)).insert(0).append().merge()"
        );
    }

    #[test]
    fn test_every_variant_renders() {
        assert_eq!(source().item(1).to_string(), "source[1]");
        assert_eq!(source().item(-1).to_string(), "source[-1]");
        assert_eq!(source().text("a").text("b").to_string(), "source.a.b");
        assert_eq!(if_supplied("FLAG").to_string(), "if_supplied(FLAG)");
        assert_eq!(value(42i64).to_string(), "value(42)");
        assert_eq!(value("x").to_string(), "value('x')");
        assert_eq!(
            convert(source(), Converter::new("best", Ok)).to_string(),
            "convert(source, best)"
        );
    }

    #[test]
    fn test_text_sugar() {
        let path = Path::from_text("x.y.z");
        assert_eq!(path.to_string(), "x.y.z");
        assert_eq!(path.len(), 3);
        assert!(path
            .ops()
            .iter()
            .all(|op| matches!(op, Operation::Text(_))));
    }

    #[test]
    fn test_integer_sugar() {
        let path = 3usize.into_path();
        assert!(matches!(path.ops(), [Operation::Item(Key::Index(3))]));
    }

    #[test]
    fn test_builder_names_are_plain_attributes() {
        // attribute names that match builder methods stay attributes
        let path = target().attr("merge").attr("insert");
        assert!(matches!(
            path.ops(),
            [Operation::Attr(a), Operation::Attr(b)] if a == "merge" && b == "insert"
        ));
        assert_eq!(path.to_string(), "target.merge.insert");
    }

    #[test]
    fn test_extend_does_not_mutate() {
        let base = source().item("a");
        let longer = base.item("b");
        assert_eq!(base.len(), 1);
        assert_eq!(longer.len(), 2);
        assert_eq!(base.to_string(), "source['a']");
    }

    #[test]
    fn test_if_supplied_defaults() {
        let path = if_supplied(source().item("x"));
        match path.ops().last() {
            Some(Operation::IfSupplied(values)) => {
                assert_eq!(values, &default_false_values());
            }
            other => panic!("unexpected op {other:?}"),
        }

        let path = if_supplied_with("x", ["none", "-"]);
        match path.ops().last() {
            Some(Operation::IfSupplied(values)) => assert_eq!(values.len(), 2),
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_builtin_converters() {
        let integer = Converter::integer();
        assert_eq!(
            integer.apply(ConfigValue::from("12")).unwrap(),
            ConfigValue::Integer(12)
        );
        assert!(integer
            .apply(ConfigValue::from("twelve"))
            .unwrap_err()
            .is_type_conversion());
        assert!(integer
            .apply(ConfigValue::Float(1e20))
            .unwrap_err()
            .is_type_conversion());

        assert_eq!(
            Converter::boolean().apply(ConfigValue::from("yes")).unwrap(),
            ConfigValue::Boolean(true)
        );
        assert_eq!(
            Converter::float().apply(ConfigValue::Integer(2)).unwrap(),
            ConfigValue::Float(2.0)
        );
        assert_eq!(
            Converter::string().apply(ConfigValue::Integer(2)).unwrap(),
            ConfigValue::from("2")
        );
    }
}
