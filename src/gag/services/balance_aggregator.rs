use crate::ids::AccountId;
use crate::schema::{decode_balance, encode_balance, BalanceKey, DecodeError, KeyError};
use crate::store::{Store, StoreError, WriteTransaction};
use crate::{CancellationFlag, Money, Result, Transaction};

use anyhow::Context;
use rust_decimal::Decimal;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Failed to begin the balance transaction")]
    Begin(#[source] StoreError),

    #[error("Failed to commit the balance transaction")]
    Commit(#[source] StoreError),

    #[error("Failed to reset balances")]
    Reset(#[source] StoreError),

    #[error("Failed to read balance {key}")]
    Read {
        key: BalanceKey,
        #[source]
        source: StoreError,
    },

    #[error("Failed to write balance {key}")]
    Write {
        key: BalanceKey,
        #[source]
        source: StoreError,
    },

    #[error("Cannot build a balance key for account {account}")]
    Key {
        account: AccountId,
        #[source]
        source: KeyError,
    },

    #[error("Stored balance {key} is corrupt")]
    Decode {
        key: BalanceKey,
        #[source]
        source: DecodeError,
    },

    #[error("Invalid amount {amount} for account {account}")]
    Amount { account: AccountId, amount: Decimal },

    #[error("Balance {key} does not fit in minor units")]
    Overflow { key: BalanceKey },
}

/// Outcome of one aggregation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregationSummary {
    /// Transactions looked at before the pass ended
    pub seen: usize,
    pub applied: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Folds gold spend into monthly balances, one store transaction per pass.
///
/// Either every balance update of a pass is committed or none is. Two passes over the
/// same store are serialized by the store's write transaction; running them
/// concurrently has no defined merge semantics.
pub struct BalanceAggregator<'s, S: Store> {
    store: &'s S,
    reset: bool,
}

impl<'s, S: Store> BalanceAggregator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        return Self {
            store,
            reset: false,
        };
    }

    /// Drops every stored balance at the start of each pass, in the pass's own
    /// transaction, so a failed pass leaves the previous balances in place.
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Applies every gold spend in `transactions` to its monthly balance.
    ///
    /// The cancellation flag is checked before each transaction. A cancelled pass still
    /// commits what it applied so far and reports `cancelled`; only failures roll back.
    pub fn aggregate<'t, I>(
        &self,
        transactions: I,
        cancel: &CancellationFlag,
    ) -> Result<AggregationSummary>
    where
        I: IntoIterator<Item = &'t Transaction>,
    {
        let mut writer = self.store.begin_write().map_err(AggregationError::Begin)?;

        let summary = match fold_transactions(&mut writer, self.reset, transactions, cancel) {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("Aggregation failed, rolling back: {e:#}");

                if let Err(rollback_err) = writer.rollback() {
                    log::warn!("Rollback after failed aggregation also failed: {rollback_err}");
                }

                return Err(e);
            }
        };

        writer.commit().map_err(AggregationError::Commit)?;

        log::info!(
            "Aggregated {} of {} transactions ({} skipped, cancelled: {})",
            summary.applied,
            summary.seen,
            summary.skipped,
            summary.cancelled
        );

        Ok(summary)
    }
}

fn fold_transactions<'t, W, I>(
    writer: &mut W,
    reset: bool,
    transactions: I,
    cancel: &CancellationFlag,
) -> Result<AggregationSummary>
where
    W: WriteTransaction,
    I: IntoIterator<Item = &'t Transaction>,
{
    if reset {
        log::debug!("Dropping previous balances");
        writer.clear().map_err(AggregationError::Reset)?;
    }

    let mut summary = AggregationSummary::default();

    for transaction in transactions {
        if cancel.is_cancelled() {
            log::warn!("Aggregation cancelled after {} transactions", summary.seen);
            summary.cancelled = true;
            break;
        }

        summary.seen += 1;

        if !transaction.is_gold_spend() {
            summary.skipped += 1;
            continue;
        }

        let balance = apply_transaction(writer, transaction)?;
        summary.applied += 1;

        log::debug!("Balance {} is now {balance}", transaction.balance_key());
    }

    Ok(summary)
}

/// Read-modify-write of the balance a gold spend belongs to, returning the new balance.
fn apply_transaction<W: WriteTransaction>(
    writer: &mut W,
    transaction: &Transaction,
) -> Result<Money> {
    let delta = transaction
        .amount_in_minor_units()
        .with_context(|| AggregationError::Amount {
            account: transaction.account.clone(),
            amount: transaction.amount,
        })?;

    let key = transaction.balance_key();
    let encoded = encode_key(&key)?;

    let mut balance = read_encoded_balance(writer, &key, &encoded)?;

    balance
        .add(&delta)
        .with_context(|| AggregationError::Overflow { key: key.clone() })?;

    writer
        .set(&encoded, &encode_balance(balance))
        .map_err(|source| AggregationError::Write { key, source })?;

    Ok(balance)
}

/// Current balance under `key`; a balance never written reads as zero.
pub fn read_balance<W: WriteTransaction>(writer: &mut W, key: &BalanceKey) -> Result<Money> {
    let encoded = encode_key(key)?;
    read_encoded_balance(writer, key, &encoded)
}

fn read_encoded_balance<W: WriteTransaction>(
    writer: &mut W,
    key: &BalanceKey,
    encoded: &[u8],
) -> Result<Money> {
    let value = writer
        .get(encoded)
        .map_err(|source| AggregationError::Read {
            key: key.clone(),
            source,
        })?;

    let balance = match value {
        Some(value) => decode_balance(encoded, &value).map_err(|source| AggregationError::Decode {
            key: key.clone(),
            source,
        })?,
        None => Money::ZERO,
    };

    Ok(balance)
}

fn encode_key(key: &BalanceKey) -> Result<Vec<u8>> {
    let encoded = key.encode().map_err(|source| AggregationError::Key {
        account: key.account.clone(),
        source,
    })?;

    Ok(encoded)
}
