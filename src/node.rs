//! Navigable views over a configuration tree.
//!
//! [`Node`] is a read-only view. Looking up a child gives back an [`Item`]:
//! mappings, sequences and records come back wrapped as further nodes so
//! lookups can be chained, scalars come back as plain values. Deferred values
//! are resolved when they are reached.
//!
//! [`NodeMut`] is a write handle for one position in the tree. It keeps the
//! container that owns the position plus the step that selects it, so
//! [`NodeMut::set`] edits the real owner.

use crate::error::{ConfigError, ConfigResult};
use crate::merge::MergeContext;
use crate::path::{IntoPath, Key, Operation};
use crate::resolve;
use crate::value::{ConfigValue, ValueKind};
use std::borrow::Cow;

/// A child looked up through a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum Item<'a> {
    /// Mapping, sequence or record
    Node(Node<'a>),
    /// Scalar
    Value(ConfigValue),
}

impl<'a> Item<'a> {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    pub fn as_node(&self) -> Option<&Node<'a>> {
        match self {
            Item::Node(node) => Some(node),
            Item::Value(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node<'a>> {
        match self {
            Item::Node(node) => Some(node),
            Item::Value(_) => None,
        }
    }

    /// The underlying value, whichever way it was wrapped.
    pub fn value(&self) -> &ConfigValue {
        match self {
            Item::Node(node) => node.data(),
            Item::Value(value) => value,
        }
    }

    pub fn into_value(self) -> ConfigValue {
        match self {
            Item::Node(node) => node.into_value(),
            Item::Value(value) => value,
        }
    }

    /// Looks up a child of a wrapped container; scalars have no children.
    pub fn get(&self, key: impl Into<Key>) -> ConfigResult<Option<Item<'a>>> {
        match self {
            Item::Node(node) => node.get(key),
            Item::Value(_) => Ok(None),
        }
    }

    /// Like [`Item::get`] but missing children are an error.
    pub fn child(&self, key: impl Into<Key>) -> ConfigResult<Item<'a>> {
        let key = key.into();
        self.get(key.clone())?
            .ok_or_else(|| ConfigError::key_not_found(key.as_mapping_key()))
    }
}

impl PartialEq<ConfigValue> for Item<'_> {
    fn eq(&self, other: &ConfigValue) -> bool {
        self.value() == other
    }
}

/// A read-only view over part of a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    data: Cow<'a, ConfigValue>,
}

impl<'a> Node<'a> {
    pub fn new(data: &'a ConfigValue) -> Self {
        Self {
            data: Cow::Borrowed(data),
        }
    }

    pub fn data(&self) -> &ConfigValue {
        &self.data
    }

    pub fn into_value(self) -> ConfigValue {
        self.data.into_owned()
    }

    pub fn kind(&self) -> ValueKind {
        self.data.kind()
    }

    /// Number of children; zero for scalars.
    pub fn len(&self) -> usize {
        match self.data() {
            ConfigValue::Object(map) => map.len(),
            ConfigValue::Array(items) => items.len(),
            ConfigValue::Record(record) => record.fields().len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        let op = accessor(self.data(), key.into());
        matches!(resolve::lookup(&op, self.data()), Ok(Some(_)))
    }

    /// Looks up a child by key, index, or record field.
    ///
    /// Keys that do not apply to this node's shape (a name on a sequence, any
    /// key on a scalar) give `None`.
    ///
    /// # Errors
    /// * `ConfigError::NotConfigured` - The child is an unset deferred value
    pub fn get(&self, key: impl Into<Key>) -> ConfigResult<Option<Item<'a>>> {
        let op = accessor(self.data(), key.into());
        match self.step(&op) {
            Ok(Some(child)) => wrap(child).map(Some),
            Ok(None) | Err(ConfigError::NotIndexable { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Like [`Node::get`] but missing children are an error.
    pub fn child(&self, key: impl Into<Key>) -> ConfigResult<Item<'a>> {
        let key = key.into();
        self.get(key.clone())?
            .ok_or_else(|| ConfigError::key_not_found(key.as_mapping_key()))
    }

    /// Key/child pairs sorted by key, for mappings and records.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedOperation` - This node is a sequence or scalar
    pub fn items(&self) -> ConfigResult<Vec<(String, Item<'a>)>> {
        let mut keys: Vec<String> = match self.data() {
            ConfigValue::Object(map) => map.keys().cloned().collect(),
            ConfigValue::Record(record) => record.fields().keys().cloned().collect(),
            other => {
                return Err(ConfigError::unsupported_operation(
                    "items()",
                    other.type_name(),
                ))
            }
        };
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let item = self.child(key.as_str())?;
                Ok((key, item))
            })
            .collect()
    }

    /// Children in order: sequence elements, or mapping values sorted by key.
    pub fn values(&self) -> ConfigResult<Vec<Item<'a>>> {
        match self.data() {
            ConfigValue::Array(items) => (0..items.len()).map(|i| self.child(i)).collect(),
            _ => Ok(self.items()?.into_iter().map(|(_, item)| item).collect()),
        }
    }

    /// Follows a navigational path (items, attributes, text segments).
    ///
    /// # Errors
    /// * `ConfigError::KeyNotFound` - Nothing exists at the path
    /// * `ConfigError::InvalidPath` - The path contains non-navigational steps
    pub fn node(&self, path: impl IntoPath) -> ConfigResult<Item<'a>> {
        let path = path.into_path();
        check_navigational(path.ops())?;
        let mut current = Item::Node(self.clone());
        for op in path.ops() {
            let node = match current {
                Item::Node(node) => node,
                Item::Value(_) => return Err(ConfigError::key_not_found(path.to_string())),
            };
            current = match node.step(op)? {
                Some(child) => wrap(child)?,
                None => return Err(ConfigError::key_not_found(path.to_string())),
            };
        }
        Ok(current)
    }

    fn step(&self, op: &Operation) -> ConfigResult<Option<Cow<'a, ConfigValue>>> {
        match &self.data {
            Cow::Borrowed(data) => Ok(resolve::lookup(op, *data)?.map(Cow::Borrowed)),
            Cow::Owned(data) => Ok(resolve::lookup(op, data)?.cloned().map(Cow::Owned)),
        }
    }
}

impl<'a> From<&'a ConfigValue> for Node<'a> {
    fn from(data: &'a ConfigValue) -> Self {
        Node::new(data)
    }
}

/// The step used to read `key` from `data`: attributes on records, items otherwise.
fn accessor(data: &ConfigValue, key: Key) -> Operation {
    match data {
        ConfigValue::Record(_) => Operation::Attr(key.as_mapping_key()),
        _ => Operation::Item(key),
    }
}

/// Wraps containers as nodes and resolves deferred values.
fn wrap(value: Cow<'_, ConfigValue>) -> ConfigResult<Item<'_>> {
    let mut value = value;
    if let ConfigValue::Deferred(deferred) = value.as_ref() {
        value = Cow::Owned(deferred.resolve()?);
    }
    if value.is_container() {
        Ok(Item::Node(Node { data: value }))
    } else {
        Ok(Item::Value(value.into_owned()))
    }
}

pub(crate) fn check_navigational(ops: &[Operation]) -> ConfigResult<()> {
    match ops
        .iter()
        .find(|op| !matches!(op, Operation::Item(_) | Operation::Attr(_) | Operation::Text(_)))
    {
        Some(op) => Err(ConfigError::invalid_path(format!(
            "Cannot use {} in a node path",
            op.label()
        ))),
        None => Ok(()),
    }
}

/// A write handle for one position in a tree.
#[derive(Debug)]
pub struct NodeMut<'a> {
    container: &'a mut ConfigValue,
    accessor: Option<Operation>,
}

impl<'a> NodeMut<'a> {
    /// A handle for the whole of `data`.
    pub fn root(data: &'a mut ConfigValue) -> Self {
        Self {
            container: data,
            accessor: None,
        }
    }

    /// A handle for the position `accessor` selects inside `container`.
    pub(crate) fn at(container: &'a mut ConfigValue, accessor: Operation) -> Self {
        Self {
            container,
            accessor: Some(accessor),
        }
    }

    /// The current value at this position, if there is one.
    pub fn get(&self) -> Option<&ConfigValue> {
        match &self.accessor {
            Some(op) => resolve::lookup(op, &*self.container).ok().flatten(),
            None => Some(&*self.container),
        }
    }

    /// A read-only view of the current value.
    pub fn node(&self) -> Option<Node<'_>> {
        self.get().map(Node::new)
    }

    /// Replaces the value at this position inside its owner.
    ///
    /// # Errors
    /// * `ConfigError::IndexOutOfRange` - The position is past the end of a sequence
    /// * `ConfigError::UnsupportedOperation` - The owner cannot hold named children
    pub fn set(&mut self, value: impl Into<ConfigValue>) -> ConfigResult<()> {
        let value = value.into();
        match &self.accessor {
            Some(op) => {
                if let Some(replacement) =
                    resolve::set(op, self.container, value, &MergeContext::default())?
                {
                    *self.container = replacement;
                }
            }
            None => *self.container = value,
        }
        Ok(())
    }
}
