//! The root configuration object.

use crate::env;
use crate::error::{ConfigError, ConfigResult, ConfigResultExt};
use crate::merge::{MergeContext, Mergers};
use crate::node::{check_navigational, Item, Node, NodeMut};
use crate::parser::{ConfigParser, Parsers};
use crate::path::{IntoPath, Key, Operation, Path};
use crate::resolve::{self, load, store, Resolved};
use crate::value::ConfigValue;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Read};
use std::ops::{Add, Deref, DerefMut};
use std::path::{Path as FsPath, PathBuf};
use tracing::debug;

/// Ordered source-to-target path pairs used by [`Config::merge_mapped`].
///
/// Entries are applied in insertion order.
///
/// # Example
/// ```
/// use strata::path::{convert, source, target, Converter};
/// use strata::Mapping;
///
/// let mapping = Mapping::new()
///     .map(source().item("foo"), target().item("x"))
///     .map(convert("APP_PORT", Converter::integer()), "server.port");
/// assert_eq!(mapping.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: Vec<(Path, Path)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, returning the extended mapping.
    pub fn map(mut self, source: impl IntoPath, target: impl IntoPath) -> Self {
        self.insert(source, target);
        self
    }

    pub fn insert(&mut self, source: impl IntoPath, target: impl IntoPath) {
        self.entries.push((source.into_path(), target.into_path()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Path, Path)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: IntoPath, T: IntoPath> FromIterator<(S, T)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (source, target) in iter {
            mapping.insert(source, target);
        }
        mapping
    }
}

/// A configuration tree built up by merging sources into it.
///
/// A `Config` owns its data, which starts out as an empty mapping. Other
/// configurations, or raw values, are merged in either as a whole tree or
/// through a [`Mapping`] of source paths to target paths.
///
/// # Example
/// ```
/// use serde_json::json;
/// use strata::path::{source, target};
/// use strata::{Config, ConfigValue, Mapping};
///
/// let mut config = Config::from_value(json!({"x": "old", "list": [1]}));
/// config.merge(ConfigValue::from(json!({"list": [2]}))).unwrap();
/// config
///     .merge_mapped(
///         ConfigValue::from(json!({"foo": "bar"})),
///         &Mapping::new().map(source().item("foo"), target().item("x")),
///     )
///     .unwrap();
///
/// assert_eq!(config.data(), &ConfigValue::from(json!({"x": "bar", "list": [1, 2]})));
/// ```
#[derive(Debug)]
pub struct Config {
    data: ConfigValue,
    /// Snapshots saved by [`Config::push`], most recent last
    stack: Vec<ConfigValue>,
}

impl Config {
    /// Creates a configuration holding an empty mapping.
    pub fn new() -> Self {
        Self::from_value(ConfigValue::object())
    }

    /// Creates a configuration holding `data`, which may be of any shape.
    pub fn from_value(data: impl Into<ConfigValue>) -> Self {
        Self {
            data: data.into(),
            stack: Vec::new(),
        }
    }

    pub fn data(&self) -> &ConfigValue {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ConfigValue {
        &mut self.data
    }

    pub fn into_value(self) -> ConfigValue {
        self.data
    }

    /// Merges the whole of `source` into this configuration.
    ///
    /// The merge engine decides how values combine: mappings merge key by
    /// key, sequences concatenate, and where kinds cannot be merged inside a
    /// mapping the incoming value wins.
    ///
    /// # Errors
    /// * `ConfigError::MergeTypeMismatch` - The roots cannot be merged; the
    ///   configuration is left unchanged
    pub fn merge(&mut self, source: impl AsRef<ConfigValue>) -> ConfigResult<()> {
        self.merge_with(source, None, None)
    }

    /// Copies values from `source` into this configuration as `mapping` directs.
    ///
    /// Each entry loads its source path from `source` and stores the result
    /// at its target path. Entries whose source is absent are skipped.
    ///
    /// # Errors
    /// Any error from resolving an entry; entries before the failing one have
    /// already been applied.
    pub fn merge_mapped(
        &mut self,
        source: impl AsRef<ConfigValue>,
        mapping: &Mapping,
    ) -> ConfigResult<()> {
        self.merge_with(source, Some(mapping), None)
    }

    /// Merges `source` with an optional mapping and optional merge strategies.
    ///
    /// # Arguments
    /// * `source` - The data to merge in
    /// * `mapping` - Path pairs to apply; `None` merges the whole tree
    /// * `mergers` - Strategy table to use; `None` uses [`crate::default_mergers`]
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use strata::{default_mergers, Config, ConfigValue, ValueKind};
    ///
    /// let mergers = default_mergers().with(ValueKind::Array, |_, source, _| Ok(source.clone()));
    /// let mut config = Config::from_value(json!({"hosts": ["a", "b"]}));
    /// config
    ///     .merge_with(ConfigValue::from(json!({"hosts": ["c"]})), None, Some(mergers))
    ///     .unwrap();
    /// assert_eq!(config.data(), &ConfigValue::from(json!({"hosts": ["c"]})));
    /// ```
    pub fn merge_with(
        &mut self,
        source: impl AsRef<ConfigValue>,
        mapping: Option<&Mapping>,
        mergers: Option<Mergers>,
    ) -> ConfigResult<()> {
        let source = source.as_ref();
        let context = MergeContext::with_mergers(mergers);
        match mapping {
            None => {
                debug!(
                    source = %source.kind(),
                    into = %self.data.kind(),
                    "merging configuration"
                );
                self.data = context.merge(source, &self.data)?;
            }
            Some(mapping) => {
                for (source_path, target_path) in mapping.iter() {
                    debug!(from = %source_path, to = %target_path, "applying mapping entry");
                    let value =
                        load(source, source_path).with_context(|| format!("reading {source_path}"))?;
                    store(&mut self.data, target_path, value, Some(&context))
                        .with_context(|| format!("writing {target_path}"))?;
                }
            }
        }
        Ok(())
    }

    /// Reads a value at `path` without wrapping it.
    pub fn load(&self, path: impl IntoPath) -> ConfigResult<Resolved> {
        load(&self.data, path)
    }

    /// A read-only view of the whole tree.
    pub fn root(&self) -> Node<'_> {
        Node::new(&self.data)
    }

    /// Looks up a top-level child; see [`Node::get`].
    pub fn get(&self, key: impl Into<Key>) -> ConfigResult<Option<Item<'_>>> {
        self.root().get(key)
    }

    /// Looks up a top-level child that must exist.
    ///
    /// # Errors
    /// * `ConfigError::KeyNotFound` - There is no such child
    pub fn child(&self, key: impl Into<Key>) -> ConfigResult<Item<'_>> {
        self.root().child(key)
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.root().contains(key)
    }

    /// Top-level key/child pairs, sorted by key.
    pub fn items(&self) -> ConfigResult<Vec<(String, Item<'_>)>> {
        self.root().items()
    }

    pub fn values(&self) -> ConfigResult<Vec<Item<'_>>> {
        self.root().values()
    }

    /// Follows a navigational path from the root.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use strata::{Config, ConfigValue};
    ///
    /// let config = Config::from_value(json!({"db": {"hosts": ["a", "b"]}}));
    /// assert_eq!(config.node("db.hosts.1").unwrap(), ConfigValue::from("b"));
    /// ```
    pub fn node(&self, path: impl IntoPath) -> ConfigResult<Item<'_>> {
        self.root().node(path)
    }

    /// A write handle for the position at `path`.
    ///
    /// An empty path gives a handle for the whole tree. Without `create`,
    /// everything along the path must already exist. With `create`, missing
    /// mappings along the way are added and the path must end in a text
    /// segment, which names the entry the handle will write.
    ///
    /// # Errors
    /// * `ConfigError::InvalidPath` - The path has non-navigational steps, or
    ///   `create` is set and the path does not end in a text segment
    /// * `ConfigError::KeyNotFound` - Without `create`, part of the path is missing
    ///
    /// # Example
    /// ```
    /// use strata::path::source;
    /// use strata::{Config, ConfigValue};
    ///
    /// let mut config = Config::new();
    /// config.node_mut("a.b", true).unwrap().set(1i64).unwrap();
    /// assert_eq!(config.node("a.b").unwrap(), ConfigValue::Integer(1));
    ///
    /// assert!(config.node_mut(source().item("a").item("b"), true).is_err());
    /// ```
    pub fn node_mut(&mut self, path: impl IntoPath, create: bool) -> ConfigResult<NodeMut<'_>> {
        let path = path.into_path();
        check_navigational(path.ops())?;
        let Some((last, parents)) = path.ops().split_last() else {
            return Ok(NodeMut::root(&mut self.data));
        };
        if create && !matches!(last, Operation::Text(_)) {
            return Err(ConfigError::invalid_path(format!(
                "Cannot create {path}: path must end with a text segment"
            )));
        }

        let mut container = &mut self.data;
        for op in parents {
            container = if create {
                resolve::ensure(op, container)?
            } else {
                match resolve::lookup_mut(op, container)? {
                    Some(child) => child,
                    None => return Err(ConfigError::key_not_found(path.to_string())),
                }
            };
        }
        if !create && resolve::lookup(last, container)?.is_none() {
            return Err(ConfigError::key_not_found(path.to_string()));
        }
        Ok(NodeMut::at(container, last.clone()))
    }

    /// A new configuration holding this one's data with `other` merged in.
    ///
    /// Neither operand is changed.
    pub fn try_add(&self, other: impl AsRef<ConfigValue>) -> ConfigResult<Config> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Replaces the data with `config` merged over it, saving the current data.
    ///
    /// With `empty`, the data becomes a copy of `config` alone. Undo with
    /// [`Config::pop`].
    ///
    /// # Errors
    /// * `ConfigError::MergeTypeMismatch` - Without `empty`, `config` cannot be merged; nothing
    ///   is pushed
    pub fn push(&mut self, config: impl AsRef<ConfigValue>, empty: bool) -> ConfigResult<()> {
        let data = if empty {
            config.as_ref().clone()
        } else {
            MergeContext::default().merge(config.as_ref(), &self.data)?
        };
        self.stack.push(std::mem::replace(&mut self.data, data));
        debug!(depth = self.stack.len(), empty, "pushed configuration");
        Ok(())
    }

    /// Restores the data saved by the most recent [`Config::push`].
    ///
    /// # Errors
    /// * `ConfigError::InvalidPath` - Nothing has been pushed
    pub fn pop(&mut self) -> ConfigResult<()> {
        let previous = self
            .stack
            .pop()
            .ok_or_else(|| ConfigError::invalid_path("Cannot pop() when nothing has been pushed"))?;
        self.data = previous;
        debug!(depth = self.stack.len(), "popped configuration");
        Ok(())
    }

    /// Number of pushes not yet popped.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes `config` for the lifetime of the returned guard.
    ///
    /// When the guard is dropped the data is restored to what it was before
    /// this call, however many extra pushes happened in between.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use strata::{Config, ConfigValue};
    ///
    /// let mut config = Config::from_value(json!({"debug": false}));
    /// {
    ///     let mut scoped = config.pushed(ConfigValue::from(json!({"debug": true})), false).unwrap();
    ///     assert_eq!(scoped.node("debug").unwrap(), ConfigValue::Boolean(true));
    ///     scoped.push(ConfigValue::object(), true).unwrap();
    /// }
    /// assert_eq!(config.node("debug").unwrap(), ConfigValue::Boolean(false));
    /// assert_eq!(config.depth(), 0);
    /// ```
    pub fn pushed(
        &mut self,
        config: impl AsRef<ConfigValue>,
        empty: bool,
    ) -> ConfigResult<PushGuard<'_>> {
        let depth = self.stack.len();
        self.push(config, empty)?;
        Ok(PushGuard {
            config: self,
            depth,
        })
    }

    /// Parses `text` with `parser`.
    pub fn from_text(text: &str, parser: &dyn ConfigParser) -> ConfigResult<Config> {
        Ok(Config::from_value(parser.parse(text)?))
    }

    /// Reads `reader` to the end and parses it with `parser`.
    pub fn from_reader<R: Read>(mut reader: R, parser: &dyn ConfigParser) -> ConfigResult<Config> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Config::from_text(&text, parser)
    }

    /// Loads a configuration file.
    ///
    /// A leading `~` is expanded to the home directory. Without an explicit
    /// parser, one is picked from the default [`Parsers`] by file extension.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - No parser was given and none is
    ///   registered for the file's extension
    /// * `ConfigError::Io` - The file cannot be read
    /// * `ConfigError::Parse` - The content cannot be parsed
    ///
    /// # Example
    /// ```no_run
    /// use strata::Config;
    ///
    /// let config = Config::from_path("~/.myapp/config.yaml", None).unwrap();
    /// ```
    pub fn from_path(
        path: impl AsRef<FsPath>,
        parser: Option<&dyn ConfigParser>,
    ) -> ConfigResult<Config> {
        match parser {
            Some(parser) => read_path(&expand_home(path.as_ref()), parser),
            None => Config::from_path_with(path, &Parsers::default()),
        }
    }

    /// Loads a configuration file, picking the parser from `parsers`.
    pub fn from_path_with(path: impl AsRef<FsPath>, parsers: &Parsers) -> ConfigResult<Config> {
        let path = expand_home(path.as_ref());
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ConfigError::unsupported_format(format!("'{}'", path.display())))?;
        let parser = parsers.get(extension)?;
        read_path(&path, parser.as_ref())
    }

    /// Collects environment variables, optionally only those named `{prefix}_...`.
    ///
    /// The result is a flat mapping of variable name to string value; see
    /// [`crate::env`].
    pub fn from_env(prefix: Option<&str>) -> Config {
        Config::from_value(env::collect(prefix))
    }

    /// Like [`Config::from_env`] over the given name/value pairs.
    pub fn from_vars<I, K, V>(vars: I, prefix: Option<&str>) -> Config
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Config::from_value(env::from_vars(vars, prefix))
    }

    /// Serializes the data with `parser`.
    pub fn to_text(&self, parser: &dyn ConfigParser) -> ConfigResult<String> {
        parser.serialize(&self.data)
    }

    /// Writes the data to a file, creating parent directories as needed.
    ///
    /// Without an explicit parser the format follows the file extension.
    pub fn write_to_path(
        &self,
        path: impl AsRef<FsPath>,
        parser: Option<&dyn ConfigParser>,
    ) -> ConfigResult<()> {
        let path = expand_home(path.as_ref());
        let content = match parser {
            Some(parser) => self.to_text(parser)?,
            None => {
                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .ok_or_else(|| ConfigError::unsupported_format(format!("'{}'", path.display())))?;
                self.to_text(Parsers::default().get(extension)?.as_ref())?
            }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create parent directories for '{}': {e}",
                        path.display()
                    ),
                ))
            })?;
        }
        fs::write(&path, content).map_err(|e| {
            ConfigError::Io(io::Error::new(
                e.kind(),
                format!("Failed to write configuration to '{}': {e}", path.display()),
            ))
        })?;
        debug!(path = %path.display(), "wrote configuration");
        Ok(())
    }

    /// Runs `validator` over the data.
    ///
    /// # Example
    /// ```
    /// use serde_json::json;
    /// use strata::{Config, ConfigError};
    ///
    /// let config = Config::from_value(json!({"port": 0}));
    /// let result = config.validate(|data| match data.as_object().and_then(|m| m.get("port")) {
    ///     Some(port) if port.as_i64() != Some(0) => Ok(()),
    ///     _ => Err(ConfigError::invalid_value("port must be set")),
    /// });
    /// assert!(result.is_err());
    /// ```
    pub fn validate<F>(&self, validator: F) -> ConfigResult<()>
    where
        F: FnOnce(&ConfigValue) -> ConfigResult<()>,
    {
        validator(&self.data)
    }

    /// Deserializes the whole tree into `T`.
    ///
    /// # Example
    /// ```
    /// use serde::Deserialize;
    /// use serde_json::json;
    /// use strata::Config;
    ///
    /// #[derive(Deserialize, Debug, PartialEq)]
    /// struct Server {
    ///     host: String,
    ///     port: u16,
    ///     #[serde(default)]
    ///     tls: bool,
    /// }
    ///
    /// let config = Config::from_value(json!({"host": "localhost", "port": 8080}));
    /// let server: Server = config.unmarshal().unwrap();
    /// assert_eq!(server.port, 8080);
    /// assert!(!server.tls);
    /// ```
    pub fn unmarshal<T>(&self) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(serde_json::to_value(&self.data)?).map_err(|e| {
            ConfigError::deserialization(format!("Failed to unmarshal configuration: {e}"))
        })
    }

    /// Deserializes the value at `path` into `T`.
    ///
    /// # Errors
    /// * `ConfigError::KeyNotFound` - Nothing exists at `path`
    /// * `ConfigError::Deserialization` - The value does not fit `T`
    pub fn unmarshal_path<T>(&self, path: impl IntoPath) -> ConfigResult<T>
    where
        T: DeserializeOwned,
    {
        let path = path.into_path();
        let value = match load(&self.data, &path)? {
            Resolved::Present(value) => value,
            Resolved::NotPresent(_) => return Err(ConfigError::key_not_found(path.to_string())),
        };
        serde_json::from_value(serde_json::to_value(&value)?).map_err(|e| {
            ConfigError::deserialization(format!("Failed to unmarshal '{path}': {e}"))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the data only; the copy has nothing pushed.
impl Clone for Config {
    fn clone(&self) -> Self {
        Self::from_value(self.data.clone())
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl From<ConfigValue> for Config {
    fn from(data: ConfigValue) -> Self {
        Self::from_value(data)
    }
}

impl AsRef<ConfigValue> for Config {
    fn as_ref(&self) -> &ConfigValue {
        &self.data
    }
}

impl Add<&Config> for &Config {
    type Output = ConfigResult<Config>;

    fn add(self, other: &Config) -> ConfigResult<Config> {
        self.try_add(other)
    }
}

/// Restores a [`Config`] to its state before [`Config::pushed`] when dropped.
#[derive(Debug)]
pub struct PushGuard<'a> {
    config: &'a mut Config,
    depth: usize,
}

impl Deref for PushGuard<'_> {
    type Target = Config;

    fn deref(&self) -> &Config {
        self.config
    }
}

impl DerefMut for PushGuard<'_> {
    fn deref_mut(&mut self) -> &mut Config {
        self.config
    }
}

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        let stack = &mut self.config.stack;
        if stack.len() <= self.depth {
            return;
        }
        stack.truncate(self.depth + 1);
        if let Some(data) = stack.pop() {
            self.config.data = data;
        }
        debug!(depth = self.depth, "restored configuration");
    }
}

/// Expands a leading `~` component to the home directory.
pub(crate) fn expand_home(path: &FsPath) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn read_path(path: &FsPath, parser: &dyn ConfigParser) -> ConfigResult<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(io::Error::new(
            e.kind(),
            format!("Failed to read '{}': {e}", path.display()),
        ))
    })?;
    let data = parser.parse(&content).map_config_err(|e| match e {
        ConfigError::Parse { message, .. } => {
            ConfigError::parse_error(path.display().to_string(), message)
        }
        other => other,
    })?;
    debug!(path = %path.display(), parser = parser.name(), "loaded configuration file");
    Ok(Config::from_value(data))
}
