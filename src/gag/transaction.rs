use crate::ids::AccountId;
use crate::schema::{BalanceKey, Period};
use crate::{Money, Result};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Target currency code that marks a purchase of gold
pub const GOLD_CURRENCY_CODE: &str = "GGM";

/// Transaction represents a single card payment from the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub first_name: String,
    pub last_name: String,
    pub account: AccountId,
    pub description: String,
    pub merchant_code: String,
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub date_time: NaiveDateTime,
}

impl Transaction {
    /// Only merchant payments converted into gold count towards a balance
    pub fn is_gold_spend(&self) -> bool {
        !self.merchant_code.is_empty() && self.to_currency == GOLD_CURRENCY_CODE
    }

    pub fn amount_in_minor_units(&self) -> Result<Money> {
        Money::from_decimal(self.amount)
    }

    pub fn period(&self) -> Period {
        Period::from_date_time(&self.date_time)
    }

    /// Monthly balance record this transaction is folded into
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey::new(self.period(), self.account.clone())
    }
}
