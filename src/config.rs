use crate::args::{self, InputArgs};

use gag::services::DEFAULT_TOP_N;
use gag::store::ScanDirection;
use gag::Result;

use std::{env, path::PathBuf, str::FromStr};

use log::LevelFilter;
use simple_logger::SimpleLogger;

use thiserror::Error;

pub const TOP_N_VAR: &str = "GAG_TOP_N";
pub const REVERSE_VAR: &str = "GAG_REVERSE";
pub const RESET_STORE_VAR: &str = "GAG_RESET_STORE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {1:?} for {0}")]
    InvalidVar(&'static str, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_path: PathBuf,
    pub store_path: Option<PathBuf>,
    pub top_n: usize,
    pub direction: ScanDirection,
    /// Drop previous balances before aggregating
    pub reset_store: bool,
}

impl Config {
    fn from_parts(args: InputArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let top_n = match lookup(TOP_N_VAR) {
            Some(value) => parse_var(TOP_N_VAR, &value)?,
            None => DEFAULT_TOP_N,
        };

        let reverse = match lookup(REVERSE_VAR) {
            Some(value) => parse_flag(REVERSE_VAR, &value)?,
            None => false,
        };

        let reset_store = match lookup(RESET_STORE_VAR) {
            Some(value) => parse_flag(RESET_STORE_VAR, &value)?,
            None => true,
        };

        Ok(Self {
            input_path: args.input_path,
            store_path: args.store_path,
            top_n,
            direction: if reverse {
                ScanDirection::Reverse
            } else {
                ScanDirection::Forward
            },
            reset_store,
        })
    }
}

pub fn configure_logger() -> Result {
    SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()?;

    return Ok(());
}

/// Reads the command line and the `GAG_*` environment variables
pub fn load_config() -> Result<Config> {
    let args = args::parse_input_args()?;

    Config::from_parts(args, |name| env::var(name).ok())
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T> {
    let parsed = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVar(name, value.to_string()))?;

    Ok(parsed)
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar(name, value.to_string()).into()),
    }
}
