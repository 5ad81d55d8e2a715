//! Error types and utilities for strata configuration management.

/// Result type alias for strata operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Comprehensive error types for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing failed
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Requested configuration key was not found
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// A `required()` path resolved to nothing
    #[error("Required value not present: {key} (from {path})")]
    Required { key: String, path: String },

    /// Type conversion failed
    #[error("Type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// Two values whose kinds cannot be merged
    #[error("Cannot merge {source_kind} with {target_kind}")]
    MergeTypeMismatch {
        source_kind: String,
        target_kind: String,
    },

    /// A path was used in a way its operations do not support
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Attribute access on a record lacking the attribute
    #[error("No attribute '{name}'")]
    MissingAttribute { name: String },

    /// Item access on a value that cannot be indexed with the given key
    #[error("{kind} cannot be indexed with {key}")]
    NotIndexable { kind: String, key: String },

    /// A write operation the container's shape does not support
    #[error("Cannot use {op} on {kind}")]
    UnsupportedOperation { op: String, kind: String },

    /// Sequence index outside the sequence
    #[error("Index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// A deferred value was used before being set
    #[error("Cannot use {name} before it is configured")]
    NotConfigured { name: String },

    /// No parser is registered for the configuration format
    #[error("No parser found for {extension}")]
    UnsupportedFormat { extension: String },

    /// Serialization operation failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization operation failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Deserialization(err.to_string())
    }
}

impl ConfigError {
    /// Creates a new parse error with context.
    pub fn parse_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new type conversion error.
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new key not found error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Creates a new merge type mismatch error.
    pub fn merge_mismatch(source_kind: impl Into<String>, target_kind: impl Into<String>) -> Self {
        Self::MergeTypeMismatch {
            source_kind: source_kind.into(),
            target_kind: target_kind.into(),
        }
    }

    /// Creates a new invalid path (usage) error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }

    /// Creates a new missing attribute error.
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute { name: name.into() }
    }

    /// Creates a new unsupported operation error.
    pub fn unsupported_operation(op: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            op: op.into(),
            kind: kind.into(),
        }
    }

    /// Creates a new unsupported format error.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a new deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Creates a new invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Returns true if this error is related to a missing key.
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, ConfigError::KeyNotFound { .. })
    }

    /// Returns true if a required value was absent.
    pub fn is_required(&self) -> bool {
        matches!(self, ConfigError::Required { .. })
    }

    /// Returns true if this error is a merge between incompatible kinds.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, ConfigError::MergeTypeMismatch { .. })
    }

    /// Returns true if this error is a path usage error.
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, ConfigError::InvalidPath(_))
    }

    /// Returns true if this error is related to type conversion.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self, ConfigError::TypeConversion { .. })
    }

    /// Returns true if this error is related to parsing.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::Parse { .. })
    }

    /// Returns true if this error is related to IO operations.
    pub fn is_io_error(&self) -> bool {
        matches!(self, ConfigError::Io(_))
    }
}

/// Extension trait for adding context to Results.
pub trait ConfigResultExt<T> {
    /// Adds context to a ConfigError if the result is an error.
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String;

    /// Maps a ConfigError to a different ConfigError variant.
    fn map_config_err<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce(ConfigError) -> ConfigError;
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn with_context<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| match err {
            ConfigError::Parse {
                source_name,
                message,
            } => ConfigError::Parse {
                source_name,
                message: format!("{}: {}", f(), message),
            },
            ConfigError::InvalidPath(message) => {
                ConfigError::InvalidPath(format!("{}: {}", f(), message))
            }
            other => other,
        })
    }

    fn map_config_err<F>(self, f: F) -> ConfigResult<T>
    where
        F: FnOnce(ConfigError) -> ConfigError,
    {
        self.map_err(f)
    }
}
