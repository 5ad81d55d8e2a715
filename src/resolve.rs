//! Evaluating paths against data: reading with [`load`] and writing with [`store`].
//!
//! Reading never fails just because something is missing. A missing key or
//! attribute produces a [`NotPresent`] marker that flows through the rest of
//! the path until a `required()` step turns it into an error. Writing a
//! [`NotPresent`] value is a no-op, so optional sources never clobber
//! existing configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::merge::MergeContext;
use crate::path::{IntoPath, Key, Operation, Path};
use crate::value::ConfigValue;
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace};

/// Marker for "nothing at this path step", carrying the key that was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotPresent {
    key: String,
}

impl NotPresent {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// The key or attribute name that was missing.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for NotPresent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not present: {}", self.key)
    }
}

/// The outcome of [`load`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Present(ConfigValue),
    NotPresent(NotPresent),
}

impl Resolved {
    pub fn is_present(&self) -> bool {
        matches!(self, Resolved::Present(_))
    }

    /// The value, if one was found.
    pub fn into_option(self) -> Option<ConfigValue> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::NotPresent(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ConfigValue> {
        match self {
            Resolved::Present(value) => Some(value),
            Resolved::NotPresent(_) => None,
        }
    }
}

impl From<ConfigValue> for Resolved {
    fn from(value: ConfigValue) -> Self {
        Resolved::Present(value)
    }
}

impl From<NotPresent> for Resolved {
    fn from(absent: NotPresent) -> Self {
        Resolved::NotPresent(absent)
    }
}

/// The running value while a path is being read.
enum Running<'a> {
    Value(Cow<'a, ConfigValue>),
    Missing(NotPresent),
}

/// Reads the value at `path` in `data`.
///
/// # Errors
/// * `ConfigError::Required` - A `required()` step met a missing value
/// * `ConfigError::InvalidPath` - The path contains `insert()`, `append()` or `merge()`
/// * `ConfigError::NotIndexable` - An item step was applied to a scalar or record
/// * `ConfigError::NotConfigured` - Traversal went through an unset deferred value
/// * Any error returned by a converter
///
/// # Example
/// ```
/// use serde_json::json;
/// use strata::path::{required, source};
/// use strata::resolve::{load, Resolved};
/// use strata::ConfigValue;
///
/// let data = ConfigValue::from(json!({"foo": ["a", "b"]}));
/// assert_eq!(
///     load(&data, source().item("foo").item(1)).unwrap(),
///     Resolved::Present(ConfigValue::from("b"))
/// );
/// assert!(!load(&data, "bar").unwrap().is_present());
/// assert!(load(&data, required("bar")).is_err());
/// ```
pub fn load(data: &ConfigValue, path: impl IntoPath) -> ConfigResult<Resolved> {
    let path = path.into_path();
    let mut running = Running::Value(Cow::Borrowed(data));
    for op in path.ops() {
        trace!(op = op.label(), path = %path, "loading");
        running = step(op, running, &path)?;
    }
    Ok(match running {
        Running::Value(value) => Resolved::Present(value.into_owned()),
        Running::Missing(absent) => Resolved::NotPresent(absent),
    })
}

fn step<'a>(op: &Operation, running: Running<'a>, path: &Path) -> ConfigResult<Running<'a>> {
    match op {
        Operation::Insert(_) | Operation::Append | Operation::Merge => Err(
            ConfigError::invalid_path(format!("Cannot use {} in source", op.label())),
        ),
        Operation::Required => match running {
            Running::Missing(absent) => Err(ConfigError::Required {
                key: absent.key,
                path: path.to_string(),
            }),
            present => Ok(present),
        },
        _ => match running {
            Running::Missing(absent) => Ok(Running::Missing(absent)),
            Running::Value(current) => apply(op, current),
        },
    }
}

fn apply<'a>(op: &Operation, current: Cow<'a, ConfigValue>) -> ConfigResult<Running<'a>> {
    match op {
        Operation::Convert(converter) => {
            let current = materialize(current)?;
            Ok(Running::Value(Cow::Owned(
                converter.apply(current.into_owned())?,
            )))
        }
        Operation::IfSupplied(false_values) => {
            let current = materialize(current)?;
            if false_values.contains(current.as_ref()) {
                Ok(Running::Missing(NotPresent::new(current.to_string())))
            } else {
                Ok(Running::Value(current))
            }
        }
        Operation::Literal(value) => Ok(Running::Value(Cow::Owned(value.clone()))),
        _ => {
            let current = materialize(current)?;
            Ok(match descend(op, current)? {
                Some(child) => Running::Value(child),
                None => Running::Missing(NotPresent::new(missing_key(op))),
            })
        }
    }
}

/// Replaces a deferred value by what it resolves to.
fn materialize(current: Cow<'_, ConfigValue>) -> ConfigResult<Cow<'_, ConfigValue>> {
    if let ConfigValue::Deferred(deferred) = current.as_ref() {
        return Ok(Cow::Owned(deferred.resolve()?));
    }
    Ok(current)
}

fn descend<'a>(
    op: &Operation,
    current: Cow<'a, ConfigValue>,
) -> ConfigResult<Option<Cow<'a, ConfigValue>>> {
    match current {
        Cow::Borrowed(value) => Ok(lookup(op, value)?.map(Cow::Borrowed)),
        Cow::Owned(value) => Ok(lookup(op, &value)?.cloned().map(Cow::Owned)),
    }
}

fn missing_key(op: &Operation) -> String {
    match op {
        Operation::Item(key) => key.as_mapping_key(),
        Operation::Attr(name) | Operation::Text(name) => name.clone(),
        other => other.label().to_string(),
    }
}

/// Navigational read of one step. `None` means the key is absent.
pub(crate) fn lookup<'v>(
    op: &Operation,
    value: &'v ConfigValue,
) -> ConfigResult<Option<&'v ConfigValue>> {
    match op {
        Operation::Item(key) => lookup_item(value, key),
        Operation::Attr(name) => Ok(value.as_record().and_then(|record| record.get(name))),
        Operation::Text(name) => match value {
            ConfigValue::Object(map) => Ok(map.get(name)),
            ConfigValue::Array(_) => lookup_item(value, &Key::Name(name.clone())),
            ConfigValue::Record(record) => Ok(record.get(name)),
            _ => Ok(None),
        },
        other => Err(ConfigError::invalid_path(format!(
            "Cannot navigate with {}",
            other.label()
        ))),
    }
}

/// Mutable counterpart of [`lookup`]; never creates anything.
pub(crate) fn lookup_mut<'v>(
    op: &Operation,
    value: &'v mut ConfigValue,
) -> ConfigResult<Option<&'v mut ConfigValue>> {
    match op {
        Operation::Item(key) => lookup_item_mut(value, key),
        Operation::Attr(name) => Ok(match value {
            ConfigValue::Record(record) => record.get_mut(name),
            _ => None,
        }),
        Operation::Text(name) => match value {
            ConfigValue::Object(map) => Ok(map.get_mut(name)),
            ConfigValue::Array(_) => lookup_item_mut(value, &Key::Name(name.clone())),
            ConfigValue::Record(record) => Ok(record.get_mut(name)),
            _ => Ok(None),
        },
        other => Err(ConfigError::invalid_path(format!(
            "Cannot navigate with {}",
            other.label()
        ))),
    }
}

fn lookup_item_mut<'v>(
    value: &'v mut ConfigValue,
    key: &Key,
) -> ConfigResult<Option<&'v mut ConfigValue>> {
    match value {
        ConfigValue::Object(map) => Ok(map.get_mut(&key.as_mapping_key())),
        ConfigValue::Array(items) => {
            let at = normalize_index(index_of(key)?, items.len());
            Ok(at.and_then(move |i| items.get_mut(i)))
        }
        other => Err(not_indexable(other, key)),
    }
}

fn lookup_item<'v>(value: &'v ConfigValue, key: &Key) -> ConfigResult<Option<&'v ConfigValue>> {
    match value {
        ConfigValue::Object(map) => Ok(map.get(&key.as_mapping_key())),
        ConfigValue::Array(items) => {
            Ok(normalize_index(index_of(key)?, items.len()).and_then(|i| items.get(i)))
        }
        other => Err(not_indexable(other, key)),
    }
}

fn not_indexable(value: &ConfigValue, key: &Key) -> ConfigError {
    ConfigError::NotIndexable {
        kind: value.type_name().to_string(),
        key: key.to_string(),
    }
}

/// The integer a key denotes when indexing a sequence.
fn index_of(key: &Key) -> ConfigResult<i64> {
    match key {
        Key::Index(index) => Ok(*index),
        Key::Name(name) => name.parse().map_err(|_| ConfigError::NotIndexable {
            kind: "Array".to_string(),
            key: key.to_string(),
        }),
    }
}

/// Resolves a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Position for `insert()`, clamped into the sequence.
fn insert_position(index: i64, len: usize) -> usize {
    let len = len as i64;
    let index = if index < 0 { (index + len).max(0) } else { index.min(len) };
    index as usize
}

/// Writes `value` at `path` inside `data`.
///
/// Every operation but the last is used to find (and, for mappings, create)
/// the container to write into. The last operation writes the value; a final
/// `merge()` combines it with what is already there. A [`NotPresent`] value
/// leaves `data` untouched. When `context` is `None` the default mergers are
/// used.
///
/// # Errors
/// * `ConfigError::InvalidPath` - Empty path, a read-only step such as
///   `convert()` or `required()`, or `merge()` before the end
/// * `ConfigError::MissingAttribute` - An attribute step through a record field that does not exist
/// * `ConfigError::IndexOutOfRange` - An item step past the end of a sequence
/// * `ConfigError::MergeTypeMismatch` - A final `merge()` between different kinds
///
/// # Example
/// ```
/// use serde_json::json;
/// use strata::path::target;
/// use strata::resolve::store;
/// use strata::ConfigValue;
///
/// let mut data = ConfigValue::from(json!({"x": {"y": 1}}));
/// store(&mut data, target().item("x").merge(), ConfigValue::from(json!({"z": 2})), None).unwrap();
/// assert_eq!(data, ConfigValue::from(json!({"x": {"y": 1, "z": 2}})));
/// ```
pub fn store(
    data: &mut ConfigValue,
    path: impl IntoPath,
    value: impl Into<Resolved>,
    context: Option<&MergeContext>,
) -> ConfigResult<()> {
    let path = path.into_path();
    check_target(&path)?;
    let Some((last, intermediate)) = path.ops().split_last() else {
        return Err(ConfigError::invalid_path("Cannot store at root"));
    };
    let value = match value.into() {
        Resolved::Present(value) => value,
        Resolved::NotPresent(absent) => {
            debug!(path = %path, key = absent.key(), "skipping store of absent value");
            return Ok(());
        }
    };

    let default_context;
    let context = match context {
        Some(context) => context,
        None => {
            default_context = MergeContext::default();
            &default_context
        }
    };

    let mut container = data;
    for op in intermediate {
        trace!(op = op.label(), path = %path, "ensuring");
        container = ensure(op, container)?;
    }
    if let Some(replacement) = set(last, container, value, context)? {
        *container = replacement;
    }
    Ok(())
}

/// Rejects paths that cannot be written to, before any data is touched.
fn check_target(path: &Path) -> ConfigResult<()> {
    let last = path.len().saturating_sub(1);
    for (position, op) in path.ops().iter().enumerate() {
        match op {
            Operation::Convert(_)
            | Operation::Required
            | Operation::IfSupplied(_)
            | Operation::Literal(_) => {
                return Err(ConfigError::invalid_path(format!(
                    "Cannot use {} as target",
                    op.label()
                )))
            }
            Operation::Merge if position != last => {
                return Err(ConfigError::invalid_path("merge() must be final operation"))
            }
            _ => {}
        }
    }
    Ok(())
}

/// Returns the child container at one step, creating it where the shape allows.
pub(crate) fn ensure<'v>(
    op: &Operation,
    container: &'v mut ConfigValue,
) -> ConfigResult<&'v mut ConfigValue> {
    match op {
        Operation::Item(key) => ensure_item(container, key),
        Operation::Attr(name) => match container {
            ConfigValue::Record(record) => record
                .get_mut(name)
                .ok_or_else(|| ConfigError::missing_attribute(name.clone())),
            _ => Err(ConfigError::missing_attribute(name.clone())),
        },
        Operation::Text(name) => match container {
            ConfigValue::Object(_) | ConfigValue::Array(_) => {
                ensure_item(container, &Key::Name(name.clone()))
            }
            ConfigValue::Record(record) => record
                .get_mut(name)
                .ok_or_else(|| ConfigError::missing_attribute(name.clone())),
            _ => Err(ConfigError::missing_attribute(name.clone())),
        },
        Operation::Insert(index) => {
            let items = sequence_mut(op, container)?;
            let at = insert_position(*index, items.len());
            items.insert(at, ConfigValue::object());
            Ok(&mut items[at])
        }
        Operation::Append => {
            let items = sequence_mut(op, container)?;
            let at = items.len();
            items.push(ConfigValue::object());
            Ok(&mut items[at])
        }
        Operation::Merge => Err(ConfigError::invalid_path("merge() must be final operation")),
        other => Err(ConfigError::invalid_path(format!(
            "Cannot use {} as target",
            other.label()
        ))),
    }
}

fn ensure_item<'v>(container: &'v mut ConfigValue, key: &Key) -> ConfigResult<&'v mut ConfigValue> {
    match container {
        ConfigValue::Object(map) => Ok(map
            .entry(key.as_mapping_key())
            .or_insert_with(ConfigValue::object)),
        ConfigValue::Array(items) => {
            let index = index_of(key)?;
            let len = items.len();
            match normalize_index(index, len) {
                Some(at) => Ok(&mut items[at]),
                None => Err(ConfigError::IndexOutOfRange { index, len }),
            }
        }
        other => Err(not_indexable(other, key)),
    }
}

/// Writes the final step. Returns a replacement for `container` when the
/// operation produces a new value rather than editing in place.
pub(crate) fn set(
    op: &Operation,
    container: &mut ConfigValue,
    value: ConfigValue,
    context: &MergeContext,
) -> ConfigResult<Option<ConfigValue>> {
    match op {
        Operation::Item(key) => set_item(container, key, value).map(|_| None),
        Operation::Attr(name) => match container {
            ConfigValue::Record(record) => {
                record.set(name.clone(), value);
                Ok(None)
            }
            other => Err(ConfigError::unsupported_operation(
                "attribute assignment",
                other.type_name(),
            )),
        },
        Operation::Text(name) => match container {
            ConfigValue::Object(_) | ConfigValue::Array(_) => {
                set_item(container, &Key::Name(name.clone()), value).map(|_| None)
            }
            ConfigValue::Record(record) => {
                record.set(name.clone(), value);
                Ok(None)
            }
            other => Err(ConfigError::unsupported_operation(
                "attribute assignment",
                other.type_name(),
            )),
        },
        Operation::Insert(index) => {
            let items = sequence_mut(op, container)?;
            let at = insert_position(*index, items.len());
            items.insert(at, value);
            Ok(None)
        }
        Operation::Append => {
            sequence_mut(op, container)?.push(value);
            Ok(None)
        }
        Operation::Merge => context.merge(&value, container).map(Some),
        other => Err(ConfigError::invalid_path(format!(
            "Cannot use {} as target",
            other.label()
        ))),
    }
}

fn set_item(container: &mut ConfigValue, key: &Key, value: ConfigValue) -> ConfigResult<()> {
    match container {
        ConfigValue::Object(map) => {
            map.insert(key.as_mapping_key(), value);
            Ok(())
        }
        ConfigValue::Array(items) => {
            let index = index_of(key)?;
            let len = items.len();
            match normalize_index(index, len) {
                Some(at) => {
                    items[at] = value;
                    Ok(())
                }
                None => Err(ConfigError::IndexOutOfRange { index, len }),
            }
        }
        other => Err(not_indexable(other, key)),
    }
}

fn sequence_mut<'v>(
    op: &Operation,
    container: &'v mut ConfigValue,
) -> ConfigResult<&'v mut Vec<ConfigValue>> {
    match container {
        ConfigValue::Array(items) => Ok(items),
        other => Err(ConfigError::unsupported_operation(
            op.label(),
            other.type_name(),
        )),
    }
}
