//! Environment variables as a configuration source.
//!
//! Variables are collected into a flat mapping keyed by the full variable
//! name, with string values. They are meant to be pulled into a structured
//! configuration with a mapped merge:
//!
//! ```rust
//! use strata::path::{convert, Converter};
//! use strata::{Config, Mapping};
//!
//! let environ = strata::env::from_vars([("APP_PORT", "8080"), ("HOME", "/root")], Some("APP"));
//!
//! let mut config = Config::from_value(serde_json::json!({"port": 80}));
//! config
//!     .merge_mapped(
//!         &Config::from_value(environ),
//!         &Mapping::new().map(convert("APP_PORT", Converter::integer()), "port"),
//!     )
//!     .unwrap();
//! assert_eq!(config.get("port").unwrap().unwrap(), strata::ConfigValue::Integer(8080));
//! ```

use crate::value::ConfigValue;
use std::collections::HashMap;
use std::env;
use tracing::debug;

/// Collects the process environment.
///
/// With a prefix, only variables named `{prefix}_...` are kept; names are not
/// shortened. Variables whose name or value is not valid unicode are skipped.
pub fn collect(prefix: Option<&str>) -> ConfigValue {
    let vars = env::vars_os().filter_map(|(key, value)| {
        let key = key.into_string().ok()?;
        let value = value.into_string().ok()?;
        Some((key, value))
    });
    from_vars(vars, prefix)
}

/// Builds the mapping [`collect`] would build, from any name/value pairs.
pub fn from_vars<I, K, V>(vars: I, prefix: Option<&str>) -> ConfigValue
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let marker = prefix.map(|prefix| format!("{prefix}_"));
    let map: HashMap<String, ConfigValue> = vars
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .filter(|(key, _)| {
            marker
                .as_deref()
                .map_or(true, |marker| key.starts_with(marker))
        })
        .map(|(key, value)| (key, ConfigValue::String(value)))
        .collect();
    debug!(count = map.len(), prefix = ?prefix, "collected environment variables");
    ConfigValue::Object(map)
}

/// The variable name conventionally used for a dotted configuration key.
///
/// # Example
/// ```
/// use strata::env::var_name;
///
/// assert_eq!(var_name(Some("APP"), "database.host"), "APP_DATABASE_HOST");
/// assert_eq!(var_name(None, "port"), "PORT");
/// ```
pub fn var_name(prefix: Option<&str>, key: &str) -> String {
    let name = key.to_uppercase().replace(['.', '-'], "_");
    match prefix {
        Some(prefix) => format!("{prefix}_{name}"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_with_prefix() {
        let vars = [
            ("APP_PORT", "8080"),
            ("APP_DATABASE_HOST", "db"),
            ("APPLE", "fruit"),
            ("HOME", "/root"),
        ];
        let collected = from_vars(vars, Some("APP"));
        let map = collected.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["APP_PORT"], ConfigValue::from("8080"));
        assert_eq!(map["APP_DATABASE_HOST"], ConfigValue::from("db"));
    }

    #[test]
    fn test_from_vars_without_prefix_keeps_everything() {
        let collected = from_vars([("A", "1"), ("B", "")], None);
        let map = collected.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["B"], ConfigValue::from(""));
    }

    #[test]
    fn test_collect_reads_process_environment() {
        env::set_var("STRATA_ENV_UNIT_TEST_VALUE", "present");
        let collected = collect(Some("STRATA_ENV_UNIT_TEST"));
        env::remove_var("STRATA_ENV_UNIT_TEST_VALUE");

        let map = collected.as_object().unwrap();
        assert_eq!(
            map.get("STRATA_ENV_UNIT_TEST_VALUE"),
            Some(&ConfigValue::from("present"))
        );
    }

    #[test]
    fn test_var_name() {
        assert_eq!(var_name(Some("APP"), "first-url"), "APP_FIRST_URL");
        assert_eq!(var_name(None, "a.b.c"), "A_B_C");
    }
}
