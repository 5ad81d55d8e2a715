//! Helpers for common ways of laying out configuration files.

use crate::config::{expand_home, Config};
use crate::error::{ConfigError, ConfigResult};
use crate::value::ConfigValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads a file that may name another file it extends.
///
/// The file at `path` is loaded and, if it has an entry under `key`, the file
/// that entry names is loaded next, and so on down the chain. The chain is then
/// merged oldest first, so each file overrides the ones it extends, and `key`
/// is removed from the result. A relative `key` path is taken relative to the
/// directory of the file that contains it.
///
/// When `root` is given and a file has a top-level entry with that name, only
/// that entry is used from the file, and `key` is looked up inside it.
///
/// # Errors
/// * `ConfigError::InvalidValue` - The `key` entry is not a string, or the
///   chain loops back on itself
/// * Any error from loading or merging the files
///
/// # Example
/// ```no_run
/// use strata::patterns::load_with_extends;
///
/// // app.yaml:  { extends: base.yaml, port: 8080 }
/// // base.yaml: { host: localhost, port: 80 }
/// let config = load_with_extends("app.yaml", "extends", None).unwrap();
/// assert!(!config.contains("extends"));
/// ```
pub fn load_with_extends(
    path: impl AsRef<Path>,
    key: &str,
    root: Option<&str>,
) -> ConfigResult<Config> {
    let mut layers = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(expand_home(path.as_ref()));

    while let Some(path) = next.take() {
        if !seen.insert(path.clone()) {
            return Err(ConfigError::invalid_value(format!(
                "'{}' extends itself",
                path.display()
            )));
        }

        let mut data = Config::from_path(&path, None)?.into_value();
        if let Some(root) = root {
            let section = data.as_object_mut().and_then(|map| map.remove(root));
            if let Some(section) = section {
                data = section;
            }
        }

        next = match data.as_object().and_then(|map| map.get(key)) {
            Some(ConfigValue::String(parent)) => Some(relative_to(&path, parent)),
            Some(ConfigValue::Null) | None => None,
            Some(other) => {
                return Err(ConfigError::invalid_value(format!(
                    "'{key}' in '{}' must be a path, not {}",
                    path.display(),
                    other.type_name()
                )))
            }
        };
        debug!(path = %path.display(), extends = ?next, "loaded layer");
        layers.push(data);
    }

    let mut config = Config::new();
    for layer in layers.iter().rev() {
        config.merge(layer)?;
    }
    if let Some(map) = config.data_mut().as_object_mut() {
        map.remove(key);
    }
    Ok(config)
}

fn relative_to(file: &Path, target: &str) -> PathBuf {
    let target = expand_home(Path::new(target));
    if target.is_absolute() {
        return target;
    }
    match file.parent() {
        Some(dir) => dir.join(target),
        None => target,
    }
}
