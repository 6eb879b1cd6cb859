use gag::input::InputRecord;
use gag::{Result, Transaction};

use std::{fs::File, path::Path};

use anyhow::Context;
use csv::{Reader, ReaderBuilder, Trim};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Invalid transaction record on line {0}")]
    InvalidRecord(u64),
}

pub fn build_csv_reader(filepath: &Path) -> Result<Reader<File>> {
    let reader = ReaderBuilder::new().trim(Trim::All).from_path(filepath)?;

    return Ok(reader);
}

/// Reads and validates the whole feed before anything is aggregated.
///
/// Columns are matched by position; the header row is skipped.
pub fn read_transactions(filepath: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = build_csv_reader(filepath)?;

    let mut transactions = vec![];

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();

        log::debug!("Parsing record on line {line}: {record:?}");

        let transaction = record
            .deserialize::<InputRecord>(None)
            .map_err(anyhow::Error::from)
            .and_then(InputRecord::parse_transaction)
            .with_context(|| ReaderError::InvalidRecord(line))?;

        transactions.push(transaction);
    }

    log::debug!("Read {} transactions from {filepath:?}", transactions.len());

    Ok(transactions)
}
