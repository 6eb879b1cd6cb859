use crate::ids::AccountId;
use crate::schema::{
    decode_account, decode_balance, display_key, is_balance_key, period_prefix, DecodeError, Period,
};
use crate::store::{ReadTransaction, ScanDirection, ScanFlow, Store, StoreError};
use crate::{CancellationFlag, Money, Result};

use thiserror::Error;

/// Number of spenders reported per period unless configured otherwise
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to scan balances")]
    Store(#[from] StoreError),

    #[error("Corrupt balance record")]
    Decode(#[from] DecodeError),

    #[error("Failed to emit leaderboard for {period}")]
    Sink {
        period: Period,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spender {
    pub account: AccountId,
    pub amount: Money,
}

/// Top spenders of one period, highest balance first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodLeaderboard {
    pub period: Period,
    pub spenders: Vec<Spender>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub periods: usize,
    pub balances: usize,
    pub cancelled: bool,
}

/// Balances collected for the period currently under the scan
struct PeriodGroup {
    prefix: Vec<u8>,
    period: Period,
    spenders: Vec<Spender>,
}

impl PeriodGroup {
    fn new(prefix: &[u8], period: Period) -> Self {
        Self {
            prefix: prefix.to_vec(),
            period,
            spenders: vec![],
        }
    }

    /// Equal balances rank by account so reports are reproducible.
    fn into_leaderboard(mut self, top_n: usize) -> PeriodLeaderboard {
        self.spenders.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.account.cmp(&b.account))
        });
        self.spenders.truncate(top_n);

        PeriodLeaderboard {
            period: self.period,
            spenders: self.spenders,
        }
    }
}

/// Streams the balance store in key order and ranks each period's spenders.
///
/// Only one period's balances are held in memory at a time.
pub struct LeaderboardReporter<'s, S: Store> {
    store: &'s S,
}

impl<'s, S: Store> LeaderboardReporter<'s, S> {
    pub fn new(store: &'s S) -> Self {
        return Self { store };
    }

    /// Hands the top `top_n` spenders of every period to `sink` as soon as the scan
    /// leaves that period.
    ///
    /// Periods arrive oldest first for [`ScanDirection::Forward`] and newest first for
    /// [`ScanDirection::Reverse`]; rankings are the same either way. When cancelled the
    /// scan stops and the period in progress is dropped rather than reported partially.
    /// On error, leaderboards already handed to `sink` must be discarded.
    pub fn top_spenders_by_period<F>(
        &self,
        top_n: usize,
        direction: ScanDirection,
        cancel: &CancellationFlag,
        mut sink: F,
    ) -> Result<ReportSummary>
    where
        F: FnMut(PeriodLeaderboard) -> Result,
    {
        let mut reader = self.store.begin_read().map_err(ReportError::Store)?;

        let mut summary = ReportSummary::default();
        let mut group: Option<PeriodGroup> = None;

        reader.scan(direction, |key, value| -> std::result::Result<ScanFlow, ReportError> {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                return Ok(ScanFlow::Stop);
            }

            if !is_balance_key(key) {
                log::debug!("Skipping non-balance record {}", display_key(key));
                return Ok(ScanFlow::Continue);
            }

            let prefix = period_prefix(key)?;
            let account = decode_account(key)?;
            let amount = decode_balance(key, value)?;

            summary.balances += 1;

            let same_period = group.as_ref().is_some_and(|group| group.prefix == prefix);

            if !same_period {
                let next = PeriodGroup::new(prefix, Period::decode(key)?);

                if let Some(done) = group.replace(next) {
                    emit(done, top_n, &mut sink, &mut summary)?;
                }
            }

            if let Some(group) = group.as_mut() {
                group.spenders.push(Spender { account, amount });
            }

            Ok(ScanFlow::Continue)
        })?;

        if summary.cancelled {
            log::warn!(
                "Report cancelled after {} periods, dropping the period in progress",
                summary.periods
            );
        } else if let Some(last) = group.take() {
            emit(last, top_n, &mut sink, &mut summary)?;
        }

        reader.finish().map_err(ReportError::Store)?;

        log::info!(
            "Reported {} periods from {} balances",
            summary.periods,
            summary.balances
        );

        Ok(summary)
    }

    /// Collects every period's leaderboard, oldest period first.
    pub fn collect_top_spenders(&self, top_n: usize) -> Result<Vec<PeriodLeaderboard>> {
        let mut leaderboards = vec![];

        self.top_spenders_by_period(
            top_n,
            ScanDirection::Forward,
            &CancellationFlag::new(),
            |leaderboard| {
                leaderboards.push(leaderboard);
                Ok(())
            },
        )?;

        Ok(leaderboards)
    }
}

fn emit<F>(
    group: PeriodGroup,
    top_n: usize,
    sink: &mut F,
    summary: &mut ReportSummary,
) -> std::result::Result<(), ReportError>
where
    F: FnMut(PeriodLeaderboard) -> Result,
{
    let period = group.period;
    let leaderboard = group.into_leaderboard(top_n);

    log::debug!("Emitting leaderboard: {leaderboard:?}");

    sink(leaderboard).map_err(|e| ReportError::Sink {
        period,
        source: e.into(),
    })?;

    summary.periods += 1;

    Ok(())
}
