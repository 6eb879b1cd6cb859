use crate::services::{
    AggregationSummary, BalanceAggregator, LeaderboardReporter, PeriodLeaderboard, ReportSummary,
    DEFAULT_TOP_N,
};
use crate::store::{ScanDirection, Store};
use crate::{CancellationFlag, Result, Transaction};

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub aggregation: AggregationSummary,
    /// `None` when the run was cancelled before reporting started
    pub report: Option<ReportSummary>,
}

/// Aggregates a batch of transactions, then reports the monthly top spenders.
///
/// The report stage only starts once aggregation has committed, and is skipped when
/// aggregation was cancelled.
pub struct Pipeline<'s, S: Store> {
    aggregator: BalanceAggregator<'s, S>,
    reporter: LeaderboardReporter<'s, S>,
    top_n: usize,
    direction: ScanDirection,
}

impl<'s, S: Store> Pipeline<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            aggregator: BalanceAggregator::new(store),
            reporter: LeaderboardReporter::new(store),
            top_n: DEFAULT_TOP_N,
            direction: ScanDirection::Forward,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Replace stored balances with this run's instead of adding to them
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.aggregator = self.aggregator.with_reset(reset);
        self
    }

    pub fn run<'t, I, F>(
        &self,
        transactions: I,
        cancel: &CancellationFlag,
        sink: F,
    ) -> Result<PipelineSummary>
    where
        I: IntoIterator<Item = &'t Transaction>,
        F: FnMut(PeriodLeaderboard) -> Result,
    {
        log::debug!("Aggregating monthly gold balances...");

        let aggregation = self
            .aggregator
            .aggregate(transactions, cancel)
            .context("Aggregation failed")?;

        if aggregation.cancelled {
            log::warn!("Run cancelled during aggregation, skipping report");
            return Ok(PipelineSummary {
                aggregation,
                report: None,
            });
        }

        log::debug!("Reporting top {} spenders per period...", self.top_n);

        let report = self
            .reporter
            .top_spenders_by_period(self.top_n, self.direction, cancel, sink)
            .context("Reporting failed")?;

        Ok(PipelineSummary {
            aggregation,
            report: Some(report),
        })
    }
}
