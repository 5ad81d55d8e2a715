//! Late-bound values that can sit inside a configuration tree before they exist.

use crate::error::{ConfigError, ConfigResult};
use crate::value::ConfigValue;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A named slot whose value is supplied after the configuration is built.
///
/// Cloning a `Deferred` (including cloning a tree that contains one) shares the
/// slot, so setting it later is visible everywhere it was placed. Use
/// [`Deferred::detached`] for an independent copy.
///
/// # Example
/// ```
/// use strata::{ConfigValue, Deferred};
///
/// let db = Deferred::new("database");
/// assert!(db.resolve().is_err());
///
/// db.set(ConfigValue::from("postgres://localhost"));
/// assert_eq!(db.resolve().unwrap(), ConfigValue::from("postgres://localhost"));
/// ```
#[derive(Clone)]
pub struct Deferred {
    name: Rc<str>,
    slot: Rc<RefCell<Option<ConfigValue>>>,
}

impl Deferred {
    /// Creates an unconfigured deferred value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// The name used in "not configured" errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supplies (or replaces) the value.
    pub fn set(&self, value: impl Into<ConfigValue>) {
        *self.slot.borrow_mut() = Some(value.into());
    }

    pub fn is_configured(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Returns the current value.
    ///
    /// # Errors
    /// * `ConfigError::NotConfigured` - If no value has been set yet
    pub fn resolve(&self) -> ConfigResult<ConfigValue> {
        self.slot
            .borrow()
            .clone()
            .ok_or_else(|| ConfigError::NotConfigured {
                name: self.name.to_string(),
            })
    }

    /// Returns a copy with its own slot, holding the current value if any.
    pub fn detached(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            slot: Rc::new(RefCell::new(self.slot.borrow().clone())),
        }
    }
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new("deferred")
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("name", &self.name)
            .field("value", &self.slot.borrow())
            .finish()
    }
}
