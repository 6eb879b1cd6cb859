use crate::ids::AccountId;
use crate::schema::KEY_DELIMITER;
use crate::Transaction;
use crate::{Money, Result};

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use serde::Deserialize;

use thiserror::Error;

/// Layout of the feed's timestamp column, e.g. `31/12/2021 23:59`
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Represents a raw feed row, deserialized by column position
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub description: String,
    pub merchant_code: String,
    pub amount: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub date_time: String,
}

#[derive(Error, Debug)]
pub enum InputParseError {
    #[error("Error parsing input record: invalid amount {0:?}")]
    InvalidAmount(String, #[source] rust_decimal::Error),

    #[error("Error parsing input record: invalid date time {0:?}, expected DD/MM/YYYY HH:MM")]
    InvalidDateTime(String, #[source] chrono::ParseError),

    #[error("Error parsing input record: email missing")]
    MissingEmail,

    #[error("Error parsing input record: email {0:?} contains a NUL byte")]
    InvalidEmail(String),
}

impl InputRecord {
    pub fn parse_transaction(self) -> Result<Transaction> {
        if self.email.is_empty() {
            Err(InputParseError::MissingEmail)?;
        }

        if self.email.as_bytes().contains(&KEY_DELIMITER) {
            Err(InputParseError::InvalidEmail(self.email.clone()))?;
        }

        let amount = Decimal::from_str(&self.amount)
            .map_err(|e| InputParseError::InvalidAmount(self.amount.clone(), e))?;

        // Amounts that cannot be held in minor units are rejected before any balance is touched
        Money::from_decimal(amount)?;

        let date_time = NaiveDateTime::parse_from_str(&self.date_time, DATE_TIME_FORMAT)
            .map_err(|e| InputParseError::InvalidDateTime(self.date_time.clone(), e))?;

        Ok(Transaction {
            first_name: self.first_name,
            last_name: self.last_name,
            account: AccountId::new(self.email),
            description: self.description,
            merchant_code: self.merchant_code,
            amount,
            from_currency: self.from_currency,
            to_currency: self.to_currency,
            rate: self.rate,
            date_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::schema::Period;
    use crate::MoneyError;

    fn build_record(amount: &str, date_time: &str) -> InputRecord {
        InputRecord {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            description: "Bookshop".to_string(),
            merchant_code: "5942".to_string(),
            amount: amount.to_string(),
            from_currency: "GBP".to_string(),
            to_currency: "GGM".to_string(),
            rate: "0.0231".to_string(),
            date_time: date_time.to_string(),
        }
    }

    #[test]
    fn parse_transaction() {
        let tx = build_record("12.50", "03/10/2021 09:15")
            .parse_transaction()
            .unwrap();

        assert_eq!(tx.account, AccountId::new("ada@example.com"));
        assert_eq!(tx.period(), Period::new(2021, 10));
        assert_eq!(tx.amount_in_minor_units().unwrap(), Money(1250));
        assert!(tx.is_gold_spend());
    }

    #[test]
    fn parse_transaction_invalid_amount() {
        let err = build_record("12,50", "03/10/2021 09:15")
            .parse_transaction()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputParseError>(),
            Some(InputParseError::InvalidAmount(..))
        ));
    }

    #[test]
    fn parse_transaction_invalid_date_time() {
        let err = build_record("12.50", "2021-10-03 09:15")
            .parse_transaction()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputParseError>(),
            Some(InputParseError::InvalidDateTime(..))
        ));
    }

    #[test]
    fn parse_transaction_missing_email() {
        let mut record = build_record("12.50", "03/10/2021 09:15");
        record.email.clear();

        let err = record.parse_transaction().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputParseError>(),
            Some(InputParseError::MissingEmail)
        ));
    }

    #[test]
    fn parse_transaction_email_with_nul() {
        let mut record = build_record("12.50", "03/10/2021 09:15");
        record.email = "ada\0@example.com".to_string();

        let err = record.parse_transaction().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InputParseError>(),
            Some(InputParseError::InvalidEmail(_))
        ));
    }

    #[test]
    fn parse_transaction_amount_out_of_range() {
        let err = build_record("99999999999999999", "03/10/2021 09:15")
            .parse_transaction()
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MoneyError>(),
            Some(MoneyError::OutOfRange(_))
        ));
    }
}
