//! Integration tests for strata
//!
//! These tests drive the public API the way an application would: several
//! sources loaded from disk, the environment and the command line, merged
//! into one configuration in order of precedence.

use serde_json::json;
use strata::parser::{ConfigParser, JsonParser, Parsers, YamlParser};
use strata::path::{convert, if_supplied, required, source, target, value, Converter};
use strata::{Config, ConfigError, ConfigValue, Deferred, Mapping, ValueKind};
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test helper to create a temporary configuration file
fn create_temp_config_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let config_path = dir.path().join(name);
    fs::write(&config_path, content).expect("Failed to write test config file");
    config_path
}

/// Test helper to set environment variables and clean them up
struct EnvVarGuard {
    vars: Vec<String>,
}

impl EnvVarGuard {
    fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn set(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
        self.vars.push(key.to_string());
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for var in &self.vars {
            env::remove_var(var);
        }
    }
}

fn cv(json: serde_json::Value) -> ConfigValue {
    ConfigValue::from(json)
}

#[test]
fn test_layered_files_and_environment() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut env_guard = EnvVarGuard::new();

    let defaults = create_temp_config_file(
        &temp_dir,
        "defaults.json",
        r#"{
            "database": {"host": "localhost", "port": 5432, "pool": {"size": 5}},
            "plugins": ["core"],
            "debug": false
        }"#,
    );
    let site = create_temp_config_file(
        &temp_dir,
        "site.yml",
        "database:\n  host: db.internal\n  pool: 10\nplugins:\n  - metrics\n",
    );

    env_guard.set("STRATA_IT_LAYERED_PORT", "6000");
    env_guard.set("STRATA_IT_LAYERED_DEBUG", "true");

    let mut config = Config::from_path(&defaults, None).unwrap();
    config.merge(Config::from_path(&site, None).unwrap()).unwrap();
    config
        .merge_mapped(
            Config::from_env(Some("STRATA_IT_LAYERED")),
            &Mapping::new()
                .map(
                    convert("STRATA_IT_LAYERED_PORT", Converter::integer()),
                    "database.port",
                )
                .map(
                    convert("STRATA_IT_LAYERED_DEBUG", Converter::boolean()),
                    "debug",
                )
                .map(
                    convert("STRATA_IT_LAYERED_UNSET", Converter::integer()),
                    "database.timeout",
                ),
        )
        .unwrap();

    assert_eq!(
        config.data(),
        &cv(json!({
            "database": {"host": "db.internal", "port": 6000, "pool": 10},
            "plugins": ["core", "metrics"],
            "debug": true
        }))
    );
}

#[test]
fn test_mapped_merge_copies_item() {
    let mut config = Config::from_value(json!({"x": "old"}));
    config
        .merge_mapped(
            cv(json!({"foo": "bar"})),
            &Mapping::new().map(source().item("foo"), target().item("x")),
        )
        .unwrap();
    assert_eq!(config.data(), &cv(json!({"x": "bar"})));
}

#[test]
fn test_mapping_building_lists() {
    let mut config = Config::from_value(json!({"handlers": [{"name": "stdout"}]}));
    let incoming = cv(json!({"file": "/var/log/app.log", "level": "warn"}));
    config
        .merge_mapped(
            &incoming,
            &Mapping::new()
                .map(value("file"), target().item("handlers").append().item("name"))
                .map(source().item("file"), target().item("handlers").item(-1).item("path"))
                .map(value("syslog"), target().item("handlers").insert(0).item("name"))
                .map(source(), target().item("options").merge()),
        )
        .unwrap();
    assert_eq!(
        config.data(),
        &cv(json!({
            "handlers": [
                {"name": "syslog"},
                {"name": "stdout"},
                {"name": "file", "path": "/var/log/app.log"}
            ],
            "options": {"file": "/var/log/app.log", "level": "warn"}
        }))
    );
}

#[test]
fn test_required_and_if_supplied() {
    let incoming = cv(json!({"name": "", "token": null, "port": "80"}));

    let mut config = Config::from_value(json!({"name": "default"}));
    config
        .merge_mapped(
            &incoming,
            &Mapping::new()
                .map(if_supplied("name"), "name")
                .map(if_supplied("token"), "token")
                .map(required(convert("port", Converter::integer())), "port"),
        )
        .unwrap();
    assert_eq!(config.data(), &cv(json!({"name": "default", "port": 80})));

    let err = config
        .merge_mapped(&incoming, &Mapping::new().map(required("missing"), "x"))
        .unwrap_err();
    match err {
        ConfigError::Required { key, path } => {
            assert_eq!(key, "missing");
            assert_eq!(path, "required(missing)");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_target_only_operations_in_source_fail() {
    let mut config = Config::new();
    let err = config
        .merge_mapped(cv(json!({"a": [1]})), &Mapping::new().map(source().item("a").append(), "b"))
        .unwrap_err();
    assert!(err.is_invalid_path());

    let err = config
        .merge_mapped(
            cv(json!({"a": 1})),
            &Mapping::new().map("a", convert(target().item("b"), Converter::string())),
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid path: writing convert(target['b'], string): Cannot use convert() as target"
    );
}

#[test]
fn test_addition_and_overlays() {
    let base = Config::from_value(json!({"level": "info", "outputs": ["stdout"]}));
    let extra = Config::from_value(json!({"outputs": ["file"]}));
    let mut combined = (&base + &extra).unwrap();
    assert_eq!(
        combined.data(),
        &cv(json!({"level": "info", "outputs": ["stdout", "file"]}))
    );

    {
        let mut scoped = combined.pushed(cv(json!({"level": "debug"})), false).unwrap();
        assert_eq!(scoped.node("level").unwrap(), ConfigValue::from("debug"));
        scoped.push(cv(json!({"level": "trace"})), true).unwrap();
        assert_eq!(scoped.data(), &cv(json!({"level": "trace"})));
    }
    assert_eq!(
        combined.data(),
        &cv(json!({"level": "info", "outputs": ["stdout", "file"]}))
    );
    assert!(combined.pop().is_err());
}

#[test]
fn test_deferred_values() {
    let secret = Deferred::new("secret store");
    let mut data = cv(json!({"service": "api"}));
    data.as_object_mut()
        .unwrap()
        .insert("token".to_string(), ConfigValue::from(secret.clone()));
    let config = Config::from_value(data);

    match config.get("token") {
        Err(ConfigError::NotConfigured { name }) => assert_eq!(name, "secret store"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(config.to_text(&JsonParser).is_err());

    secret.set("s3cr3t");
    assert_eq!(config.get("token").unwrap().unwrap(), ConfigValue::from("s3cr3t"));
    let text = config.to_text(&JsonParser).unwrap();
    assert_eq!(
        Config::from_text(&text, &JsonParser).unwrap().data(),
        &cv(json!({"service": "api", "token": "s3cr3t"}))
    );
}

#[test]
fn test_multiple_file_formats() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let toml = create_temp_config_file(
        &temp_dir,
        "app.toml",
        "name = \"app\"\n\n[server]\nport = 8080\n",
    );
    let ini = create_temp_config_file(&temp_dir, "app.ini", "[server]\nhost = example.org\n");

    let mut config = Config::from_path(&toml, None).unwrap();
    config.merge(Config::from_path(&ini, None).unwrap()).unwrap();
    assert_eq!(config.node("server.port").unwrap(), ConfigValue::Integer(8080));
    assert_eq!(
        config.node("server.host").unwrap(),
        ConfigValue::from("example.org")
    );

    let yaml = config.to_text(&YamlParser).unwrap();
    assert_eq!(Config::from_text(&yaml, &YamlParser).unwrap(), config);
}

#[test]
fn test_custom_parser_registry() {
    struct Lines;

    impl ConfigParser for Lines {
        fn parse(&self, content: &str) -> strata::ConfigResult<ConfigValue> {
            Ok(ConfigValue::Array(
                content.lines().map(ConfigValue::from).collect(),
            ))
        }

        fn serialize(&self, data: &ConfigValue) -> strata::ConfigResult<String> {
            Ok(data.coerce_to_string())
        }

        fn supported_extensions(&self) -> &[&str] {
            &["lines"]
        }

        fn name(&self) -> &str {
            "Lines"
        }
    }

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = create_temp_config_file(&temp_dir, "hosts.lines", "a\nb\n");

    assert!(matches!(
        Config::from_path(&path, None).unwrap_err(),
        ConfigError::UnsupportedFormat { .. }
    ));

    let mut parsers = Parsers::default();
    parsers.register("lines", Lines);
    let config = Config::from_path_with(&path, &parsers).unwrap();
    assert_eq!(config.data().kind(), ValueKind::Array);
    assert_eq!(config.node(1).unwrap(), ConfigValue::from("b"));

    let explicit = Config::from_path(&path, Some(&Lines)).unwrap();
    assert_eq!(explicit, config);
}

#[test]
fn test_node_navigation() {
    let config = Config::from_value(json!({
        "servers": [{"name": "web1", "port": 80}, {"name": "web2", "port": 81}],
        "owner": "ops"
    }));

    let servers = config.child("servers").unwrap();
    let names: Vec<ConfigValue> = servers
        .as_node()
        .unwrap()
        .values()
        .unwrap()
        .into_iter()
        .map(|server| server.child("name").unwrap().into_value())
        .collect();
    assert_eq!(names, vec![ConfigValue::from("web1"), ConfigValue::from("web2")]);

    assert_eq!(config.node("servers.-1.port").unwrap(), ConfigValue::Integer(81));
    assert!(config.node("servers.name").is_err());
    assert!(config.node(required("owner")).unwrap_err().is_invalid_path());
}

#[test]
fn test_node_mut_writes_through() {
    let mut config = Config::from_value(json!({"servers": [{"port": 80}]}));
    config
        .node_mut(source().item("servers").item(0).item("port"), false)
        .unwrap()
        .set(8080i64)
        .unwrap();
    config
        .node_mut("logging.file.path", true)
        .unwrap()
        .set("/tmp/app.log")
        .unwrap();
    assert_eq!(
        config.data(),
        &cv(json!({
            "servers": [{"port": 8080}],
            "logging": {"file": {"path": "/tmp/app.log"}}
        }))
    );
}

#[cfg(feature = "cli")]
#[test]
fn test_command_line_arguments() {
    use clap::{Arg, ArgAction, Command};
    use strata::cli::args_record;

    let matches = Command::new("app")
        .arg(Arg::new("config").long("config").action(ArgAction::Append))
        .arg(Arg::new("port").long("port").action(ArgAction::Set))
        .arg(Arg::new("quiet").long("quiet").action(ArgAction::SetTrue))
        .try_get_matches_from(["app", "--config", "a.yaml", "--config", "b.yaml", "--port", "81"])
        .unwrap();

    let mut config = Config::from_value(json!({"files": ["base.yaml"], "port": 80, "quiet": true}));
    config
        .merge_mapped(
            ConfigValue::from(args_record(&matches)),
            &Mapping::new()
                .map(source().attr("config"), target().item("files").merge())
                .map(convert(source().attr("port"), Converter::integer()), "port")
                .map(source().attr("quiet"), "quiet")
                .map(source().attr("missing"), "missing"),
        )
        .unwrap();
    assert_eq!(
        config.data(),
        &cv(json!({"files": ["base.yaml", "a.yaml", "b.yaml"], "port": 81, "quiet": false}))
    );
}
