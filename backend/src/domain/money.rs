//! Monetary amounts.
//!
//! Amounts use [`rust_decimal::Decimal`] so sums and comparisons are exact.
//! Arithmetic and ordering are only defined within a single currency; the
//! fallible helpers return [`MoneyError::CurrencyMismatch`] otherwise.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors raised when constructing or combining [`Money`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Currency code is not three uppercase ASCII letters.
    #[error("currency code must be three uppercase letters, got '{code}'")]
    InvalidCurrency { code: String },
    /// Two amounts in different currencies were combined or compared.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        left: CurrencyCode,
        right: CurrencyCode,
    },
    /// A sum was requested over no amounts.
    #[error("cannot sum an empty set of amounts")]
    EmptySum,
    /// Decimal arithmetic overflowed.
    #[error("amount overflow")]
    Overflow,
}

/// ISO 4217 style currency code such as `EUR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Validate and construct a currency code.
    pub fn new(code: impl Into<String>) -> Result<Self, MoneyError> {
        let code = code.into();
        if code.len() == 3 && code.bytes().all(|byte| byte.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(MoneyError::InvalidCurrency { code })
        }
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// An exact decimal amount in a single currency.
///
/// Equality compares the numeric value, so `30.770 EUR == 30.77 EUR`.
///
/// # Examples
/// ```
/// use clinic_backend::domain::{CurrencyCode, Money};
/// use rust_decimal::Decimal;
///
/// let eur = CurrencyCode::new("EUR").unwrap();
/// let total = Money::new(Decimal::new(1033, 2), eur.clone())
///     .try_add(&Money::new(Decimal::new(2044, 2), eur.clone()))
///     .unwrap();
/// assert_eq!(total, Money::new(Decimal::new(3077, 2), eur));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: CurrencyCode,
}

impl Money {
    /// Construct an amount in the given currency.
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Parse a decimal string such as `"30.77"` and a currency code.
    pub fn parse(amount: &str, currency: &str) -> Result<Self, MoneyParseError> {
        let amount = amount
            .trim()
            .parse::<Decimal>()
            .map_err(|err| MoneyParseError::Amount(err.to_string()))?;
        let currency = CurrencyCode::new(currency).map_err(MoneyParseError::Currency)?;
        Ok(Self::new(amount, currency))
    }

    /// Zero in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Whether the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Add two amounts of the same currency.
    pub fn try_add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Order two amounts of the same currency.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Sum a non-empty sequence of amounts sharing one currency.
    pub fn sum<'a, I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        let mut iter = amounts.into_iter();
        let first = iter.next().ok_or(MoneyError::EmptySum)?.clone();
        iter.try_fold(first, |total, next| total.try_add(next))
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Errors raised by [`Money::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyParseError {
    #[error("invalid amount: {0}")]
    Amount(String),
    #[error(transparent)]
    Currency(MoneyError),
}
