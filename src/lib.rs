//! # STRATA
//!
//! Layered configuration for Rust applications, built by merging sources
//! into a single tree.
//!
//! Strata loads structured data and merges it into one authoritative
//! configuration. It supports:
//!
//! - Reading from JSON, TOML, YAML, INI configuration files
//! - Reading from environment variables
//! - Reading from command line flags (`cli` feature)
//! - Whole-tree merging driven by the kinds of the values being merged
//! - Declarative mappings from places in a source to places in the config,
//!   with type conversion on the way
//! - Temporary overlays that can be pushed and popped
//!
//! ## Architecture Overview
//!
//! A [`Config`] owns a [`ConfigValue`] tree. Sources are merged into it one
//! after another, so later sources take precedence over earlier ones:
//!
//! 1. **Whole-tree merge** - [`Config::merge`] hands both trees to a
//!    [`MergeContext`]. Mappings merge key by key, sequences concatenate, and
//!    the incoming value wins wherever two values cannot be merged.
//! 2. **Mapped merge** - [`Config::merge_mapped`] applies a [`Mapping`] of
//!    source [`Path`]s to target paths. Each source path is read with
//!    [`load`] and the result written with [`store`].
//!
//! Paths describe how to walk a tree. Reading and writing treat the same step
//! differently: reading a missing key gives [`NotPresent`] rather than an
//! error, and writing through a missing key creates it.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use strata::path::{convert, required, source, target, Converter};
//! use strata::{Config, ConfigValue, Mapping};
//!
//! // Defaults
//! let mut config = Config::from_value(json!({
//!     "database": {"host": "localhost", "port": 5432},
//!     "plugins": ["core"],
//! }));
//!
//! // A file, merged over the defaults
//! config
//!     .merge(ConfigValue::from(json!({"plugins": ["auth"], "debug": true})))
//!     .unwrap();
//!
//! // Selected values from another source
//! let overrides = ConfigValue::from(json!({"db_port": "6543", "db": {"name": "app"}}));
//! config
//!     .merge_mapped(
//!         overrides,
//!         &Mapping::new()
//!             .map(convert("db_port", Converter::integer()), "database.port")
//!             .map(required(source().item("db").item("name")), target().item("database").item("name"))
//!             .map("db_user", "database.user"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(config.node("database.port").unwrap(), ConfigValue::Integer(6543));
//! assert_eq!(
//!     config.node("plugins").unwrap().into_value(),
//!     ConfigValue::from(json!(["core", "auth"]))
//! );
//! assert!(config.node("database.user").is_err());
//! ```
//!
//! ## Configuration File Formats
//!
//! Strata supports multiple configuration file formats:
//!
//! ### JSON
//! ```json
//! {
//!   "database": {
//!     "host": "localhost",
//!     "port": 5432
//!   },
//!   "debug": true
//! }
//! ```
//!
//! ### YAML
//! ```yaml
//! database:
//!   host: localhost
//!   port: 5432
//! debug: true
//! ```
//!
//! ### TOML
//! ```toml
//! debug = true
//!
//! [database]
//! host = "localhost"
//! port = 5432
//! ```
//!
//! ### INI
//! ```ini
//! debug = true
//!
//! [database]
//! host = localhost
//! port = 5432
//! ```
//!
//! Files are loaded with [`Config::from_path`], which picks the parser from
//! the file extension.
//!
//! ## Environment Variables
//!
//! Environment variables are collected into a flat mapping keyed by variable
//! name and mapped into place:
//!
//! ```rust
//! use strata::path::{convert, Converter};
//! use strata::{Config, ConfigValue, Mapping};
//!
//! let environ = Config::from_vars([("MYAPP_DATABASE_PORT", "6000")], Some("MYAPP"));
//! let mut config = Config::new();
//! config
//!     .merge_mapped(
//!         &environ,
//!         &Mapping::new().map(convert("MYAPP_DATABASE_PORT", Converter::integer()), "database.port"),
//!     )
//!     .unwrap();
//! assert_eq!(config.node("database.port").unwrap(), ConfigValue::Integer(6000));
//! ```
//!
//! ## Command Line Flags
//!
//! When using the `cli` feature, parsed clap arguments become a record that is
//! read with attribute steps:
//!
//! ```rust
//! # #[cfg(feature = "cli")]
//! # {
//! use clap::{Arg, ArgAction, Command};
//! use strata::cli::args_record;
//! use strata::path::{source, target};
//! use strata::{Config, ConfigValue, Mapping};
//!
//! let matches = Command::new("myapp")
//!     .arg(Arg::new("include").long("include").action(ArgAction::Set))
//!     .try_get_matches_from(["myapp", "--include", "extra.yaml"])
//!     .unwrap();
//!
//! let mut config = Config::from_value(serde_json::json!({"files": ["base.yaml"]}));
//! config
//!     .merge_mapped(
//!         ConfigValue::from(args_record(&matches)),
//!         &Mapping::new().map(source().attr("include"), target().item("files").append()),
//!     )
//!     .unwrap();
//! # }
//! ```
//!
//! ## Struct Deserialization
//!
//! Configuration can be deserialized into Rust structs using serde:
//!
//! ```rust
//! use serde::Deserialize;
//! use strata::Config;
//!
//! #[derive(Deserialize, Debug)]
//! struct DatabaseConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! let config = Config::from_value(serde_json::json!({
//!     "database": {"host": "localhost", "port": 5432}
//! }));
//! let database: DatabaseConfig = config.unmarshal_path("database").unwrap();
//! assert_eq!(database.port, 5432);
//! ```
//!
//! ## Error Handling
//!
//! All operations return `ConfigResult<T>` which is an alias for `Result<T, ConfigError>`:
//!
//! ```rust
//! use strata::path::required;
//! use strata::{load, ConfigError, ConfigValue};
//!
//! match load(&ConfigValue::object(), required("database.host")) {
//!     Err(ConfigError::Required { key, .. }) => assert_eq!(key, "database"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Logging
//!
//! Strata reports merges, mapping entries, overlays and file loads through
//! the `tracing` facade. Install a subscriber in the application to see them.

pub mod config;
pub mod deferred;
pub mod env;
pub mod error;
pub mod merge;
pub mod node;
pub mod parser;
pub mod path;
pub mod patterns;
pub mod resolve;
pub mod value;

// Re-export main types for convenience
pub use config::{Config, Mapping, PushGuard};
pub use deferred::Deferred;
pub use error::{ConfigError, ConfigResult, ConfigResultExt};
pub use merge::{default_mergers, MergeContext, Mergers};
pub use node::{Item, Node, NodeMut};
pub use path::{
    convert, if_supplied, if_supplied_with, required, source, target, Converter, IntoPath, Key,
    Operation, Path,
};
pub use resolve::{load, store, NotPresent, Resolved};
pub use value::{ConfigValue, Record, ValueKind};

#[cfg(feature = "cli")]
pub mod cli;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
