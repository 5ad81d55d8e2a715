//! Command line arguments as a configuration source.
//!
//! Parsed clap matches are turned into a [`Record`] named `args`, one field per
//! argument id. Records are read with attribute steps, so a mapping such as
//! `source().attr("port")` picks a single argument out of the namespace.
//!
//! # Example
//! ```
//! use clap::{Arg, ArgAction, Command};
//! use strata::cli::args_record;
//! use strata::ConfigValue;
//!
//! let matches = Command::new("myapp")
//!     .arg(Arg::new("host").long("host").action(ArgAction::Set))
//!     .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
//!     .try_get_matches_from(["myapp", "--host", "localhost"])
//!     .unwrap();
//!
//! let args = args_record(&matches);
//! assert_eq!(args.get("host"), Some(&ConfigValue::from("localhost")));
//! assert_eq!(args.get("verbose"), Some(&ConfigValue::Boolean(false)));
//! ```

use crate::value::{ConfigValue, Record};
use clap::parser::ValueSource;
use clap::ArgMatches;
use tracing::debug;

/// Type name of the record built by [`args_record`].
pub const ARGS_TYPE: &str = "args";

/// Converts parsed arguments into an `args` record.
///
/// * `SetTrue`/`SetFalse` flags become booleans, whether given or not
/// * `Count` flags, and any option parsed as `u8`, become integers
/// * an option given once becomes a string, given several times an array
/// * options that were not given and have no default are left out
///
/// Other values are kept as text, whatever their value parser; use a
/// converter in the mapping to change type.
pub fn args_record(matches: &ArgMatches) -> Record {
    let mut record = Record::new(ARGS_TYPE);
    for id in matches.ids() {
        let name = id.as_str();
        if let Some(value) = convert_arg(matches, name) {
            record.set(name, value);
        }
    }
    debug!(fields = record.fields().len(), "collected command line arguments");
    record
}

fn convert_arg(matches: &ArgMatches, name: &str) -> Option<ConfigValue> {
    if !matches.contains_id(name) {
        return None;
    }

    if let Ok(Some(&flag)) = matches.try_get_one::<bool>(name) {
        return Some(ConfigValue::Boolean(flag));
    }

    if let Ok(Some(&count)) = matches.try_get_one::<u8>(name) {
        return Some(ConfigValue::Integer(i64::from(count)));
    }

    if matches.value_source(name).is_none() {
        return None;
    }

    // Raw values cover every value parser, typed or not.
    let values: Vec<ConfigValue> = match matches.try_get_raw(name) {
        Ok(Some(raw)) => raw
            .map(|value| ConfigValue::String(value.to_string_lossy().into_owned()))
            .collect(),
        _ => return None,
    };
    match values.len() {
        0 => None,
        1 => values.into_iter().next(),
        _ => Some(ConfigValue::Array(values)),
    }
}

/// Whether the argument was given on the command line rather than defaulted.
pub fn was_supplied(matches: &ArgMatches, name: &str) -> bool {
    if !matches.try_contains_id(name).unwrap_or(false) {
        return false;
    }
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn create_test_app() -> Command {
        Command::new("test")
            .disable_help_flag(true)
            .arg(
                Arg::new("host")
                    .long("host")
                    .short('h')
                    .value_name("HOST")
                    .action(ArgAction::Set)
                    .help("Database host"),
            )
            .arg(
                Arg::new("port")
                    .long("port")
                    .short('p')
                    .value_name("PORT")
                    .action(ArgAction::Set)
                    .help("Database port"),
            )
            .arg(
                Arg::new("verbose")
                    .long("verbose")
                    .short('v')
                    .action(ArgAction::SetTrue)
                    .help("Enable verbose output"),
            )
            .arg(
                Arg::new("include")
                    .long("include")
                    .short('i')
                    .value_name("PATH")
                    .action(ArgAction::Append)
                    .help("Include paths"),
            )
    }

    #[test]
    fn test_record_type_name() {
        let matches = create_test_app().try_get_matches_from(["test"]).unwrap();
        assert_eq!(args_record(&matches).type_name(), "args");
    }

    #[test]
    fn test_string_options_stay_text() {
        let matches = create_test_app()
            .try_get_matches_from(["test", "--host", "localhost", "--port", "5432"])
            .unwrap();
        let args = args_record(&matches);

        assert_eq!(args.get("host"), Some(&ConfigValue::from("localhost")));
        assert_eq!(args.get("port"), Some(&ConfigValue::from("5432")));
    }

    #[test]
    fn test_boolean_flags() {
        let matches = create_test_app()
            .try_get_matches_from(["test", "--verbose"])
            .unwrap();
        assert_eq!(
            args_record(&matches).get("verbose"),
            Some(&ConfigValue::Boolean(true))
        );

        let matches = create_test_app().try_get_matches_from(["test"]).unwrap();
        assert_eq!(
            args_record(&matches).get("verbose"),
            Some(&ConfigValue::Boolean(false))
        );
    }

    #[test]
    fn test_unset_options_are_absent() {
        let matches = create_test_app().try_get_matches_from(["test"]).unwrap();
        let args = args_record(&matches);
        assert!(!args.contains("host"));
        assert!(!args.contains("include"));
    }

    #[test]
    fn test_count_flags() {
        let app = Command::new("test").disable_help_flag(true).arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .action(ArgAction::Count)
                .help("Debug level"),
        );
        let matches = app.try_get_matches_from(["test", "-ddd"]).unwrap();
        assert_eq!(
            args_record(&matches).get("debug"),
            Some(&ConfigValue::Integer(3))
        );
    }

    #[test]
    fn test_multi_value_options() {
        let matches = create_test_app()
            .try_get_matches_from(["test", "-i", "path1", "-i", "path2", "-i", "path3"])
            .unwrap();
        match args_record(&matches).get("include") {
            Some(ConfigValue::Array(arr)) => {
                assert_eq!(arr.len(), 3);
                assert_eq!(arr[0], ConfigValue::from("path1"));
                assert_eq!(arr[2], ConfigValue::from("path3"));
            }
            other => panic!("Expected array value, got: {:?}", other),
        }
    }

    #[test]
    fn test_typed_value_parser_is_rendered_as_text() {
        let app = Command::new("test").disable_help_flag(true).arg(
            Arg::new("workers")
                .long("workers")
                .value_parser(clap::value_parser!(u16))
                .action(ArgAction::Set),
        );
        let matches = app.try_get_matches_from(["test", "--workers", "4"]).unwrap();
        assert_eq!(
            args_record(&matches).get("workers"),
            Some(&ConfigValue::from("4"))
        );
    }

    #[test]
    fn test_u8_options_read_as_counts() {
        let app = Command::new("test").disable_help_flag(true).arg(
            Arg::new("retries")
                .long("retries")
                .value_parser(clap::value_parser!(u8))
                .action(ArgAction::Set),
        );
        let matches = app.try_get_matches_from(["test", "--retries", "3"]).unwrap();
        assert_eq!(
            args_record(&matches).get("retries"),
            Some(&ConfigValue::Integer(3))
        );
    }

    #[test]
    fn test_defaults_are_kept_but_not_supplied() {
        let app = Command::new("test").disable_help_flag(true).arg(
            Arg::new("level")
                .long("level")
                .default_value("info")
                .action(ArgAction::Set),
        );
        let matches = app.try_get_matches_from(["test"]).unwrap();
        assert_eq!(
            args_record(&matches).get("level"),
            Some(&ConfigValue::from("info"))
        );
        assert!(!was_supplied(&matches, "level"));

        let app = Command::new("test").disable_help_flag(true).arg(
            Arg::new("level")
                .long("level")
                .default_value("info")
                .action(ArgAction::Set),
        );
        let matches = app
            .try_get_matches_from(["test", "--level", "warn"])
            .unwrap();
        assert!(was_supplied(&matches, "level"));
        assert!(!was_supplied(&matches, "missing"));
    }
}
