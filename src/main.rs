mod args;
mod config;
mod reader;
mod writer;

use config::Config;

use gag::store::{MemoryStore, SqliteStore, Store};
use gag::{CancellationFlag, Pipeline, Result};

use anyhow::Context;

fn main() -> Result {
    config::configure_logger()?;

    let config = config::load_config()?;

    log::debug!("Application configured: {config:?}. Beginning process...");

    let output = match &config.store_path {
        Some(store_path) => {
            let store = SqliteStore::open(store_path)
                .with_context(|| format!("Couldn't open store {store_path:?}"))?;

            run(&store, &config)?
        }
        None => run(&MemoryStore::new(), &config)?,
    };

    log::debug!("Writing to stdout: {output:?}");
    print!("{output}");

    log::debug!("Application finished successfully!");

    Ok(())
}

/// Read the feed, aggregate it into the store, and build the leaderboard report
fn run<S: Store>(store: &S, config: &Config) -> Result<String> {
    let transactions = reader::read_transactions(&config.input_path)?;

    let mut wtr = writer::build_csv_writer()?;

    let summary = Pipeline::new(store)
        .with_top_n(config.top_n)
        .with_direction(config.direction)
        .with_reset(config.reset_store)
        .run(&transactions, &CancellationFlag::new(), |leaderboard| {
            log::debug!("Writing leaderboard for {}", leaderboard.period);
            writer::write_leaderboard(&mut wtr, &leaderboard)
        })?;

    log::info!(
        "Applied {} of {} transactions, skipped {}",
        summary.aggregation.applied,
        summary.aggregation.seen,
        summary.aggregation.skipped
    );

    writer::write_to_string(wtr)
}
