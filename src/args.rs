use gag::Result;

use std::{env, fs, path::PathBuf};

use anyhow::Context;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputArgsError {
    #[error("Couldn't parse input arguments: {0}")]
    Parse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputArgs {
    pub input_path: PathBuf,
    /// SQLite file to keep balances in; an in-memory store is used when absent
    pub store_path: Option<PathBuf>,
}

const USAGE: &str = "usage: glitter-and-gold <transactions.csv> [store.sqlite]";

/// Parses the input arguments: the transactions file, then an optional store file
pub fn parse_input_args() -> Result<InputArgs> {
    parse_args(env::args().skip(1))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<InputArgs> {
    let filename = args
        .next()
        .ok_or_else(|| InputArgsError::Parse(format!("First argument must be the input file. {USAGE}")))?;

    let store_path = args.next().map(PathBuf::from);

    if let Some(extra) = args.next() {
        Err(InputArgsError::Parse(format!("Unexpected argument {extra:?}. {USAGE}")))?
    }

    let input_path = fs::canonicalize(&filename)
        .with_context(|| InputArgsError::FileNotFound(filename))?;

    Ok(InputArgs {
        input_path,
        store_path,
    })
}
