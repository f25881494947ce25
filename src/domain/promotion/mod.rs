//! Promotional pricing: coupons and offers.
//!
//! A promotion is checked in two steps. `Promotion::can_be_used` answers
//! whether it is live right now (active flag, validity window, usage cap).
//! Each kind then has its own scope rules and discount formula. Failing a
//! rule is an ordinary outcome reported as an [`Ineligibility`], never an error.
//!
//! Redemption (`increment_usage`) does no checking of its own. Callers must
//! run the checks and the increment inside one transaction or lock, or two
//! concurrent checkouts can both pass the cap check and both redeem.

pub mod coupon;
pub mod draft;
pub mod engine;
pub mod offer;

pub use coupon::{Coupon, CouponRule, CouponScope, CouponType};
pub use draft::{NewCoupon, NewOffer};
pub use engine::{best_offer, evaluate_coupon, evaluate_offer, CouponEvaluation, CouponQuote, OfferEvaluation, OfferQuote, OrderContext};
pub use offer::{Offer, OfferType};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::value_objects::{CategoryId, InvalidValue, Money, ProductId};

/// Optional start and end of the period a promotion may be used in. Both ends are inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    pub const UNBOUNDED: ValidityWindow = ValidityWindow { start_date: None, end_date: None };

    pub fn new(start_date: Option<DateTime<Utc>>, end_date: Option<DateTime<Utc>>) -> Result<Self, InvalidValue> {
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(InvalidValue::new("validity window", format!("{start} > {end}")));
            }
        }
        Ok(Self { start_date, end_date })
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> { self.start_date }
    pub fn end_date(&self) -> Option<DateTime<Utc>> { self.end_date }

    pub fn not_started(&self, now: DateTime<Utc>) -> bool { self.start_date.is_some_and(|start| now < start) }
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool { self.end_date.is_some_and(|end| now > end) }
    pub fn contains(&self, now: DateTime<Utc>) -> bool { !self.not_started(now) && !self.has_ended(now) }
}

/// Why a promotion cannot be applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    BelowMinimumOrder { minimum: Decimal },
    ExcludedProduct { product_id: ProductId },
    ExcludedCategory { category_id: CategoryId },
    NoApplicableProduct,
    NoApplicableCategory,
    FirstOrderOnly,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "promotion is not active"),
            Self::NotStarted => write!(f, "promotion has not started yet"),
            Self::Expired => write!(f, "promotion has expired"),
            Self::UsageLimitReached => write!(f, "promotion usage limit reached"),
            Self::BelowMinimumOrder { minimum } => write!(f, "order must be at least {minimum:.2}"),
            Self::ExcludedProduct { product_id } => write!(f, "product {product_id} is excluded from this promotion"),
            Self::ExcludedCategory { category_id } => write!(f, "category {category_id} is excluded from this promotion"),
            Self::NoApplicableProduct => write!(f, "no product in the order qualifies"),
            Self::NoApplicableCategory => write!(f, "no category in the order qualifies"),
            Self::FirstOrderOnly => write!(f, "promotion is only valid on a first order"),
        }
    }
}

/// Derived lifecycle state of a promotion at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus { Inactive, Pending, Active, Expired, Exhausted }

/// What coupons and offers share: the "usable right now" rules.
pub trait Promotion {
    fn is_active(&self) -> bool;
    fn window(&self) -> &ValidityWindow;
    /// Effective cap on redemptions, if any.
    fn usage_cap(&self) -> Option<u32>;
    fn used_count(&self) -> u32;

    fn is_exhausted(&self) -> bool {
        self.usage_cap().is_some_and(|cap| self.used_count() >= cap)
    }

    /// First failing usability check, or `None` when usable. All checks are evaluated.
    fn unusable_reason(&self, now: DateTime<Utc>) -> Option<Ineligibility> {
        let checks = [
            (!self.is_active()).then_some(Ineligibility::Inactive),
            self.window().not_started(now).then_some(Ineligibility::NotStarted),
            self.window().has_ended(now).then_some(Ineligibility::Expired),
            self.is_exhausted().then_some(Ineligibility::UsageLimitReached),
        ];
        checks.into_iter().flatten().next()
    }

    fn can_be_used(&self, now: DateTime<Utc>) -> bool { self.unusable_reason(now).is_none() }

    fn remaining_uses(&self) -> Option<u32> {
        self.usage_cap().map(|cap| cap.saturating_sub(self.used_count()))
    }

    fn effective_status(&self, now: DateTime<Utc>) -> PromotionStatus {
        if !self.is_active() {
            PromotionStatus::Inactive
        } else if self.window().not_started(now) {
            PromotionStatus::Pending
        } else if self.window().has_ended(now) {
            PromotionStatus::Expired
        } else if self.is_exhausted() {
            PromotionStatus::Exhausted
        } else {
            PromotionStatus::Active
        }
    }
}

/// Caps a raw discount at `max_discount` and then clamps it into `[0, order_amount]`.
pub(crate) fn clamp_discount(raw: Decimal, max_discount: Option<Decimal>, order_amount: &Money) -> Money {
    let capped = match max_discount {
        Some(cap) if raw > cap => cap,
        _ => raw,
    };
    order_amount.with_amount(capped).clamp_to(order_amount.amount())
}
