//! Value Objects for the storefront core

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A value that failed to parse or fell outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {value:?}")]
pub struct InvalidValue {
    pub field: &'static str,
    pub value: String,
}

impl InvalidValue {
    pub fn new(field: &'static str, value: impl fmt::Display) -> Self {
        Self { field, value: value.to_string() }
    }
}

/// Money value object. Amounts are never negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr")]
pub struct Money { amount: Decimal, currency: String }

#[derive(Deserialize)]
struct MoneyRepr { amount: Decimal, currency: String }

impl TryFrom<MoneyRepr> for Money {
    type Error = InvalidValue;
    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> { Money::new(repr.amount, &repr.currency) }
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, InvalidValue> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(InvalidValue::new("amount", amount));
        }
        Ok(Self { amount, currency: currency.to_uppercase() })
    }
    pub fn usd(amount: Decimal) -> Result<Self, InvalidValue> { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self { amount: Decimal::ZERO, currency: currency.to_uppercase() } }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_zero(&self) -> bool { self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(self.with_amount(self.amount + other.amount))
    }

    /// Subtracts, flooring at zero.
    pub fn saturating_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(self.with_amount((self.amount - other.amount).max(Decimal::ZERO)))
    }

    pub fn multiply(&self, qty: u32) -> Money { self.with_amount(self.amount * Decimal::from(qty)) }

    /// `percent` of this amount, rounded half away from zero to cents.
    pub fn percentage(&self, percent: Percent) -> Money {
        let raw = self.amount * percent.value() / Decimal::ONE_HUNDRED;
        self.with_amount(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Clamps this amount into `[0, ceiling]`, keeping this currency.
    pub fn clamp_to(&self, ceiling: Decimal) -> Money {
        self.with_amount(self.amount.min(ceiling).max(Decimal::ZERO))
    }

    pub(crate) fn with_amount(&self, amount: Decimal) -> Money {
        Money { amount, currency: self.currency.clone() }
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(())
    }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {:.2}", self.currency, self.amount) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// A percentage in `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percent(Decimal);

impl Percent {
    pub fn new(value: Decimal) -> Result<Self, InvalidValue> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(InvalidValue::new("percent", value));
        }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
}

impl TryFrom<Decimal> for Percent {
    type Error = InvalidValue;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Percent> for Decimal {
    fn from(p: Percent) -> Self { p.0 }
}

/// Coupon code. Stored trimmed and upper-cased so lookups are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, InvalidValue> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() || value.chars().count() > Self::MAX_LEN {
            return Err(InvalidValue::new("coupon code", value));
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for CouponCode {
    type Error = InvalidValue;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self { code.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }
    };
}

numeric_id!(
    /// Opaque order identity, assigned by the repository on first save.
    OrderId
);
numeric_id!(ProductId);
numeric_id!(CategoryId);
numeric_id!(OfferId);

/// Human-readable unique order number, e.g. `ORD-20250101-1A2B3C4D`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        Self(format!("ORD-{}-{}", now.format("%Y%m%d"), suffix))
    }

    pub fn new(value: impl Into<String>) -> Result<Self, InvalidValue> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(InvalidValue::new("order number", value)); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
