//! Command-line interface handling for the bridge host.
//!
//! This module provides command-line argument parsing using the `clap`
//! builder API.

use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option except the config path overrides the matching setting from
/// the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for bind address
    pub bind_address: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the host tick interval in milliseconds
    pub tick_ms: Option<u64>,
}

impl CliArgs {
    /// Parses the process arguments. Exits with a usage message on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, first element being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            tick_ms: matches.get_one::<u64>("tick-ms").copied(),
        }
    }
}

fn command() -> Command {
    Command::new("Session Bridge Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs a session bridge behind a WebSocket listener and drives it from a tick loop")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Bind address (e.g., 127.0.0.1:8080)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tick-ms")
                .short('t')
                .long("tick-ms")
                .value_name("MILLIS")
                .help("Host tick interval in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["bridge_host"]).expect("parse");
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert_eq!(args.bind_address, None);
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
        assert_eq!(args.tick_ms, None);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "bridge_host",
            "-c",
            "bridge.toml",
            "--bind",
            "0.0.0.0:9000",
            "-l",
            "debug",
            "--json-logs",
            "--tick-ms",
            "16",
        ])
        .expect("parse");

        assert_eq!(args.config_path, PathBuf::from("bridge.toml"));
        assert_eq!(args.bind_address.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.tick_ms, Some(16));
    }

    #[test]
    fn test_rejects_non_numeric_tick() {
        assert!(CliArgs::try_parse_from(["bridge_host", "--tick-ms", "fast"]).is_err());
    }
}
