//! Kind-dispatched recursive merging.
//!
//! A [`MergeContext`] holds a [`Mergers`] table mapping a [`ValueKind`] to the
//! function that merges two values of that kind. Out of the box, mappings are
//! merged key by key and sequences are concatenated. Any other pair of values
//! is a type mismatch unless a merger is registered for it.
//!
//! ```rust
//! use serde_json::json;
//! use strata::merge::MergeContext;
//! use strata::ConfigValue;
//!
//! let context = MergeContext::default();
//! let merged = context
//!     .merge(
//!         &ConfigValue::from(json!({"b": [3], "c": 1})),
//!         &ConfigValue::from(json!({"a": 0, "b": [1, 2]})),
//!     )
//!     .unwrap();
//! assert_eq!(merged, ConfigValue::from(json!({"a": 0, "b": [1, 2, 3], "c": 1})));
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::value::{ConfigValue, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::ops::Add;
use std::sync::Arc;
use tracing::{debug, trace};

/// Signature of a merge strategy: `(context, source, target) -> merged`.
pub type MergeFn =
    Arc<dyn Fn(&MergeContext, &ConfigValue, &ConfigValue) -> ConfigResult<ConfigValue> + Send + Sync>;

/// A table of merge strategies keyed by the kind of the target value.
#[derive(Clone, Default)]
pub struct Mergers {
    table: HashMap<ValueKind, MergeFn>,
}

impl Mergers {
    /// A table with no strategies; every merge is a mismatch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a copy of this table with `merger` registered for `kind`.
    pub fn with<F>(&self, kind: ValueKind, merger: F) -> Self
    where
        F: Fn(&MergeContext, &ConfigValue, &ConfigValue) -> ConfigResult<ConfigValue>
            + Send
            + Sync
            + 'static,
    {
        let mut mergers = self.clone();
        mergers.register(kind, merger);
        mergers
    }

    /// Registers `merger` for `kind`, replacing any existing strategy.
    pub fn register<F>(&mut self, kind: ValueKind, merger: F)
    where
        F: Fn(&MergeContext, &ConfigValue, &ConfigValue) -> ConfigResult<ConfigValue>
            + Send
            + Sync
            + 'static,
    {
        self.table.insert(kind, Arc::new(merger));
    }

    pub fn get(&self, kind: ValueKind) -> Option<&MergeFn> {
        self.table.get(&kind)
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.table.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<ValueKind> {
        let mut kinds: Vec<ValueKind> = self.table.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

/// Entries from the right-hand table win.
impl Add for Mergers {
    type Output = Mergers;

    fn add(mut self, other: Mergers) -> Mergers {
        self.table.extend(other.table);
        self
    }
}

impl fmt::Debug for Mergers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mergers").field("kinds", &self.kinds()).finish()
    }
}

/// The built-in strategies: mappings merge by key, sequences concatenate.
pub fn default_mergers() -> Mergers {
    Mergers::empty()
        .with(ValueKind::Object, merge_mapping)
        .with(ValueKind::Array, merge_sequence)
}

/// Carries the merger table through a recursive merge.
#[derive(Debug, Clone)]
pub struct MergeContext {
    mergers: Mergers,
}

impl Default for MergeContext {
    fn default() -> Self {
        Self::new(default_mergers())
    }
}

impl MergeContext {
    pub fn new(mergers: Mergers) -> Self {
        Self { mergers }
    }

    /// Uses `mergers` when given, the default table otherwise.
    pub fn with_mergers(mergers: Option<Mergers>) -> Self {
        mergers.map(Self::new).unwrap_or_default()
    }

    pub fn mergers(&self) -> &Mergers {
        &self.mergers
    }

    /// Merges `source` into `target` and returns the result.
    ///
    /// # Errors
    /// * `ConfigError::MergeTypeMismatch` - The kinds differ, or nothing is
    ///   registered for the target's kind
    pub fn merge(&self, source: &ConfigValue, target: &ConfigValue) -> ConfigResult<ConfigValue> {
        let source_kind = source.kind();
        let target_kind = target.kind();
        let merger = match self.mergers.get(target_kind) {
            Some(merger) if source_kind == target_kind => merger,
            _ => return Err(ConfigError::merge_mismatch(source_kind.name(), target_kind.name())),
        };
        trace!(kind = %target_kind, "merging");
        merger(self, source, target)
    }
}

/// Merges mappings key by key.
///
/// Keys only in `source` are copied as-is. Keys in both are merged
/// recursively; when their kinds cannot be merged the source value replaces
/// the target value.
pub fn merge_mapping(
    context: &MergeContext,
    source: &ConfigValue,
    target: &ConfigValue,
) -> ConfigResult<ConfigValue> {
    let (ConfigValue::Object(source), ConfigValue::Object(target)) = (source, target) else {
        return Err(ConfigError::merge_mismatch(source.type_name(), target.type_name()));
    };
    let mut result = target.clone();
    for (key, source_value) in source {
        let value = match result.get(key) {
            Some(target_value) => match context.merge(source_value, target_value) {
                Ok(merged) => merged,
                Err(ConfigError::MergeTypeMismatch { .. }) => {
                    debug!(key = %key, "overwriting value that cannot be merged");
                    source_value.clone()
                }
                Err(err) => return Err(err),
            },
            None => source_value.clone(),
        };
        result.insert(key.clone(), value);
    }
    Ok(ConfigValue::Object(result))
}

/// Concatenates sequences, target items first.
pub fn merge_sequence(
    _context: &MergeContext,
    source: &ConfigValue,
    target: &ConfigValue,
) -> ConfigResult<ConfigValue> {
    match (source, target) {
        (ConfigValue::Array(source), ConfigValue::Array(target)) => Ok(ConfigValue::Array(
            target.iter().chain(source.iter()).cloned().collect(),
        )),
        _ => Err(ConfigError::merge_mismatch(source.type_name(), target.type_name())),
    }
}
