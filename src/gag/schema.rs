//! Store layout for monthly balances.
//!
//! A balance record lives under
//!
//! ```text
//! YYYY 0x00 MM 0x00 <account> 0x00 balance
//! ```
//!
//! with the year and month as zero-padded ASCII digits. The period fields are fixed
//! width and the delimiter is the smallest byte, so byte order of encoded keys is the
//! order of `(year, month, account)`. The value is the balance in minor units as an
//! 8 byte little-endian `i64`.

use crate::ids::AccountId;
use crate::Money;

use std::fmt;

use chrono::{Datelike, NaiveDateTime};

use thiserror::Error;

pub const KEY_DELIMITER: u8 = 0x00;

/// Record kind suffix for balances; other kinds may share the `(period, account)` prefix.
pub const BALANCE_SUFFIX: &[u8] = b"balance";

/// `YYYY 0x00 MM 0x00`
pub const PERIOD_PREFIX_LEN: usize = 8;

/// Width of an encoded balance value in bytes.
pub const BALANCE_WIDTH: usize = 8;

const MAX_YEAR: i32 = 9999;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("Year {0} cannot be encoded in a balance key, supported range is 0..=9999")]
    YearOutOfRange(i32),

    #[error("Month {0} cannot be encoded in a balance key, expected 1..=12")]
    MonthOutOfRange(u32),

    #[error("Account {0:?} contains the key delimiter")]
    AccountContainsDelimiter(AccountId),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed balance key {key}: {reason}")]
    MalformedKey { key: String, reason: &'static str },

    #[error("Balance value for key {key} has {actual} bytes, expected {expected}")]
    BalanceWidth {
        key: String,
        expected: usize,
        actual: usize,
    },
}

/// Calendar month used as the aggregation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date_time(date_time: &NaiveDateTime) -> Self {
        Self::new(date_time.year(), date_time.month())
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), KeyError> {
        if !(0..=MAX_YEAR).contains(&self.year) {
            return Err(KeyError::YearOutOfRange(self.year));
        }

        if !(1..=12).contains(&self.month) {
            return Err(KeyError::MonthOutOfRange(self.month));
        }

        buf.extend_from_slice(format!("{:04}", self.year).as_bytes());
        buf.push(KEY_DELIMITER);
        buf.extend_from_slice(format!("{:02}", self.month).as_bytes());
        buf.push(KEY_DELIMITER);

        Ok(())
    }

    /// Decodes the typed period from a key's period prefix
    pub fn decode(key: &[u8]) -> Result<Self, DecodeError> {
        let prefix = period_prefix(key)?;

        let year = parse_digits(&prefix[0..4]).ok_or_else(|| malformed(key, "bad year"))?;
        let month = parse_digits(&prefix[5..7]).ok_or_else(|| malformed(key, "bad month"))?;

        if !(1..=12).contains(&month) {
            return Err(malformed(key, "month out of range"));
        }

        Ok(Self::new(year as i32, month))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{:04}-{:02}", self.year, self.month);
    }
}

/// Composite key of a monthly balance record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalanceKey {
    pub period: Period,
    pub account: AccountId,
}

impl BalanceKey {
    pub fn new(period: Period, account: AccountId) -> Self {
        Self { period, account }
    }

    pub fn encode(&self) -> Result<Vec<u8>, KeyError> {
        let account = self.account.as_bytes();

        if account.contains(&KEY_DELIMITER) {
            return Err(KeyError::AccountContainsDelimiter(self.account.clone()));
        }

        let mut buf =
            Vec::with_capacity(PERIOD_PREFIX_LEN + account.len() + 1 + BALANCE_SUFFIX.len());

        self.period.encode_into(&mut buf)?;
        buf.extend_from_slice(account);
        buf.push(KEY_DELIMITER);
        buf.extend_from_slice(BALANCE_SUFFIX);

        Ok(buf)
    }

    pub fn decode(key: &[u8]) -> Result<Self, DecodeError> {
        let period = Period::decode(key)?;
        let account = decode_account(key)?;

        Ok(Self::new(period, account))
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}/{}", self.period, self.account);
    }
}

/// Returns the period prefix of a key; equal prefixes mean the same period.
pub fn period_prefix(key: &[u8]) -> Result<&[u8], DecodeError> {
    if key.len() < PERIOD_PREFIX_LEN {
        return Err(malformed(key, "shorter than the period prefix"));
    }

    let prefix = &key[..PERIOD_PREFIX_LEN];

    if prefix[4] != KEY_DELIMITER || prefix[7] != KEY_DELIMITER {
        return Err(malformed(key, "period delimiters missing"));
    }

    Ok(prefix)
}

/// Extracts the account of a balance key without decoding the period.
pub fn decode_account(key: &[u8]) -> Result<AccountId, DecodeError> {
    let prefix = period_prefix(key)?;

    let rest = &key[prefix.len()..];
    let account = rest
        .strip_suffix(BALANCE_SUFFIX)
        .and_then(|rest| rest.strip_suffix(&[KEY_DELIMITER]))
        .ok_or_else(|| malformed(key, "balance suffix missing"))?;

    if account.contains(&KEY_DELIMITER) {
        return Err(malformed(key, "account contains the key delimiter"));
    }

    let account =
        std::str::from_utf8(account).map_err(|_| malformed(key, "account is not valid UTF-8"))?;

    Ok(AccountId::new(account))
}

/// Whether the key belongs to a balance record rather than another record kind.
pub fn is_balance_key(key: &[u8]) -> bool {
    key.len() > PERIOD_PREFIX_LEN + BALANCE_SUFFIX.len()
        && key.ends_with(BALANCE_SUFFIX)
        && key[key.len() - BALANCE_SUFFIX.len() - 1] == KEY_DELIMITER
}

pub fn encode_balance(balance: Money) -> [u8; BALANCE_WIDTH] {
    balance.0.to_le_bytes()
}

pub fn decode_balance(key: &[u8], value: &[u8]) -> Result<Money, DecodeError> {
    let bytes: [u8; BALANCE_WIDTH] = value.try_into().map_err(|_| DecodeError::BalanceWidth {
        key: display_key(key),
        expected: BALANCE_WIDTH,
        actual: value.len(),
    })?;

    Ok(Money(i64::from_le_bytes(bytes)))
}

/// Printable form of a raw key for logs and error messages
pub fn display_key(key: &[u8]) -> String {
    key.escape_ascii().to_string()
}

fn malformed(key: &[u8], reason: &'static str) -> DecodeError {
    DecodeError::MalformedKey {
        key: display_key(key),
        reason,
    }
}

fn parse_digits(digits: &[u8]) -> Option<u32> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const SOME_ACCOUNT: &str = "mariah@example.com";
    const OTHER_ACCOUNT: &str = "ada@example.com";

    fn key(year: i32, month: u32, account: &str) -> Vec<u8> {
        BalanceKey::new(Period::new(year, month), AccountId::new(account))
            .encode()
            .unwrap()
    }

    #[test]
    fn encode_layout() {
        assert_eq!(
            key(2022, 3, SOME_ACCOUNT),
            b"2022\x0003\x00mariah@example.com\x00balance".to_vec()
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let balance_key = BalanceKey::new(Period::new(2021, 11), AccountId::new(SOME_ACCOUNT));
        let encoded = balance_key.encode().unwrap();

        assert_eq!(BalanceKey::decode(&encoded).unwrap(), balance_key);
        assert_eq!(period_prefix(&encoded).unwrap(), b"2021\x0011\x00");
        assert_eq!(Period::decode(&encoded).unwrap(), Period::new(2021, 11));
    }

    #[test]
    fn ordering_across_year_boundary() {
        assert!(key(2021, 12, "zz@example.com") < key(2022, 1, "aa@example.com"));
        assert!(key(2019, 12, SOME_ACCOUNT) < key(2020, 1, SOME_ACCOUNT));
    }

    #[test]
    fn ordering_single_and_double_digit_months() {
        assert!(key(2022, 9, SOME_ACCOUNT) < key(2022, 10, OTHER_ACCOUNT));
        assert!(key(2022, 2, SOME_ACCOUNT) < key(2022, 11, SOME_ACCOUNT));
        assert!(key(999, 12, SOME_ACCOUNT) < key(1000, 1, SOME_ACCOUNT));
    }

    #[test]
    fn ordering_account_prefix_sorts_first() {
        assert!(key(2022, 1, "ab") < key(2022, 1, "ab0"));
        assert!(key(2022, 1, "ab") < key(2022, 1, "ab;"));
        assert!(key(2022, 1, "") < key(2022, 1, "a"));
    }

    #[test]
    fn encode_rejects_unsupported_values() {
        let account = AccountId::new(SOME_ACCOUNT);

        assert_eq!(
            BalanceKey::new(Period::new(10000, 1), account.clone()).encode(),
            Err(KeyError::YearOutOfRange(10000))
        );
        assert_eq!(
            BalanceKey::new(Period::new(-1, 1), account.clone()).encode(),
            Err(KeyError::YearOutOfRange(-1))
        );
        assert_eq!(
            BalanceKey::new(Period::new(2022, 13), account).encode(),
            Err(KeyError::MonthOutOfRange(13))
        );

        let account = AccountId::new("bad\0account");
        assert_eq!(
            BalanceKey::new(Period::new(2022, 1), account.clone()).encode(),
            Err(KeyError::AccountContainsDelimiter(account))
        );
    }

    #[test]
    fn decode_rejects_malformed_keys() {
        let cases: [&[u8]; 6] = [
            b"2022",
            b"2022;01;someone;balance",
            b"20x2\x0001\x00someone\x00balance",
            b"2022\x0013\x00someone\x00balance",
            b"2022\x0001\x00someone\x00ledger",
            b"2022\x0001\x00some\x00one\x00balance",
        ];

        for case in cases {
            assert!(
                matches!(
                    BalanceKey::decode(case),
                    Err(DecodeError::MalformedKey { .. })
                ),
                "{}",
                display_key(case)
            );
        }
    }

    #[test]
    fn is_balance_key_checks_suffix() {
        assert!(is_balance_key(&key(2022, 1, SOME_ACCOUNT)));
        assert!(!is_balance_key(b"2022\x0001\x00someone\x00ledger"));
        assert!(!is_balance_key(b"2022\x0001\x00someonebalance"));
        assert!(!is_balance_key(b"balance"));
    }

    #[test]
    fn decode_balance_width_mismatch() {
        let err = decode_balance(b"k", &[1, 2, 3]).unwrap_err();

        assert_eq!(
            err,
            DecodeError::BalanceWidth {
                key: "k".to_string(),
                expected: 8,
                actual: 3,
            }
        );
        assert!(decode_balance(b"k", &[0; 9]).is_err());
        assert!(decode_balance(b"k", &[]).is_err());
    }

    #[test]
    fn balance_is_little_endian() {
        assert_eq!(encode_balance(Money(1)), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(encode_balance(Money(-1)), [0xff; 8]);
    }

    #[test]
    fn period_display() {
        assert_eq!(Period::new(2022, 1).to_string(), "2022-01");
        assert_eq!(Period::new(987, 12).to_string(), "0987-12");
    }

    proptest! {
        #[test]
        fn balance_codec_is_lossless(balance in any::<i64>()) {
            let encoded = encode_balance(Money(balance));
            prop_assert_eq!(decode_balance(b"k", &encoded).unwrap(), Money(balance));
        }

        #[test]
        fn key_order_matches_period_then_account(
            a in (0i32..=9999, 1u32..=12, "[a-z0-9@._;-]{0,12}"),
            b in (0i32..=9999, 1u32..=12, "[a-z0-9@._;-]{0,12}"),
        ) {
            let key_a = BalanceKey::new(Period::new(a.0, a.1), AccountId::new(a.2));
            let key_b = BalanceKey::new(Period::new(b.0, b.1), AccountId::new(b.2));

            let encoded_a = key_a.encode().unwrap();
            let encoded_b = key_b.encode().unwrap();

            prop_assert_eq!(key_a.cmp(&key_b), encoded_a.cmp(&encoded_b));
            prop_assert_eq!(BalanceKey::decode(&encoded_a).unwrap(), key_a);
        }

        #[test]
        fn earlier_period_sorts_first_for_any_accounts(
            year in 0i32..9999,
            month in 1u32..=12,
            first in "[a-z@.]{0,16}",
            second in "[a-z@.]{0,16}",
        ) {
            let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

            prop_assert!(key(year, month, &first) < key(next_year, next_month, &second));
        }
    }
}
