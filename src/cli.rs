//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged over
//! the optional TOML file and `SQLALERT_*` environment variables.
//!
//! The flags keep their historical single-dash spelling (`-dsn`,
//! `-dingdingURL`). `normalize_args` rewrites those to the double-dash form
//! clap understands before parsing.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Long flags that may be written with a single leading dash.
const LONG_FLAGS: &[&str] = &["dsn", "dingdingURL", "config", "log-level"];

/// Relays PostgreSQL NOTIFY events on `sql_alert` to a DingTalk webhook.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// PostgreSQL DSN
    #[arg(long = "dsn", value_name = "DSN")]
    pub dsn: Option<String>,

    /// DingTalk webhook URL
    #[arg(long = "dingdingURL", value_name = "URL")]
    pub dingding_url: Option<String>,

    /// Path to an optional TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parses the process arguments, accepting single-dash long flags.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrites `-flag` and `-flag=value` to `--flag` / `--flag=value` for the
/// known long flags. Everything after a bare `--` is left untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            let arg: OsString = arg.into();
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split_once('=').map_or(rest, |(name, _)| name);
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{}", text))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(dsn) = &self.dsn {
            let mut database = Dict::new();
            database.insert("dsn".into(), Value::from(dsn.clone()));
            dict.insert("database".into(), Value::Dict(Tag::Default, database));
        }

        if let Some(url) = &self.dingding_url {
            let mut webhook = Dict::new();
            webhook.insert("url".into(), Value::from(url.clone()));
            dict.insert("webhook".into(), Value::Dict(Tag::Default, webhook));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
