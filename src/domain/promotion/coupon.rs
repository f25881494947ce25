//! Coupon aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::{clamp_discount, Ineligibility, Promotion, ValidityWindow};
use crate::domain::value_objects::{CategoryId, CouponCode, InvalidValue, Money, Percent, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType { Percentage, Fixed, FreeShipping }

impl CouponType {
    pub const ALL: [CouponType; 3] = [Self::Percentage, Self::Fixed, Self::FreeShipping];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
            Self::FreeShipping => "free_shipping",
        }
    }
}

impl fmt::Display for CouponType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CouponType {
    type Err = InvalidValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| InvalidValue::new("coupon type", s))
    }
}

/// How a coupon prices an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouponRule {
    Percentage(Percent),
    /// Flat amount off, independent of order size.
    Fixed(Decimal),
    /// No discount on the goods; the caller zeroes the shipping cost.
    FreeShipping,
}

impl CouponRule {
    /// Builds a rule from the `type`/`value` pair used on the wire.
    pub fn from_parts(coupon_type: CouponType, value: Decimal) -> Result<Self, InvalidValue> {
        match coupon_type {
            CouponType::Percentage => Ok(Self::Percentage(Percent::new(value)?)),
            CouponType::Fixed if value < Decimal::ZERO => Err(InvalidValue::new("coupon value", value)),
            CouponType::Fixed => Ok(Self::Fixed(value)),
            CouponType::FreeShipping => Ok(Self::FreeShipping),
        }
    }

    pub fn coupon_type(&self) -> CouponType {
        match self {
            Self::Percentage(_) => CouponType::Percentage,
            Self::Fixed(_) => CouponType::Fixed,
            Self::FreeShipping => CouponType::FreeShipping,
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            Self::Percentage(p) => p.value(),
            Self::Fixed(amount) => *amount,
            Self::FreeShipping => Decimal::ZERO,
        }
    }
}

/// Products and categories a coupon is restricted to or excluded from.
/// Exclusions always win over inclusions; an empty allow-list means "any".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponScope {
    pub applicable_products: BTreeSet<ProductId>,
    pub applicable_categories: BTreeSet<CategoryId>,
    pub excluded_products: BTreeSet<ProductId>,
    pub excluded_categories: BTreeSet<CategoryId>,
}

impl CouponScope {
    /// Exclusions are checked before inclusions.
    pub fn rejection(&self, product_ids: &BTreeSet<ProductId>, category_ids: &BTreeSet<CategoryId>) -> Option<Ineligibility> {
        if let Some(&product_id) = product_ids.intersection(&self.excluded_products).next() {
            return Some(Ineligibility::ExcludedProduct { product_id });
        }
        if let Some(&category_id) = category_ids.intersection(&self.excluded_categories).next() {
            return Some(Ineligibility::ExcludedCategory { category_id });
        }
        if !self.applicable_products.is_empty() && self.applicable_products.is_disjoint(product_ids) {
            return Some(Ineligibility::NoApplicableProduct);
        }
        if !self.applicable_categories.is_empty() && self.applicable_categories.is_disjoint(category_ids) {
            return Some(Ineligibility::NoApplicableCategory);
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coupon {
    id: Option<u64>,
    code: CouponCode,
    description: Option<String>,
    rule: CouponRule,
    min_order_amount: Option<Decimal>,
    max_discount_amount: Option<Decimal>,
    scope: CouponScope,
    is_single_use: bool,
    max_uses: Option<u32>,
    used_count: u32,
    window: ValidityWindow,
    first_time_only: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Coupon {
    pub fn new(code: CouponCode, rule: CouponRule, now: DateTime<Utc>) -> Self {
        Self {
            id: None, code, description: None, rule,
            min_order_amount: None, max_discount_amount: None, scope: CouponScope::default(),
            is_single_use: false, max_uses: None, used_count: 0,
            window: ValidityWindow::UNBOUNDED, first_time_only: false, is_active: true,
            created_at: now, updated_at: now,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self { self.id = Some(id); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = Some(description.into()); self }
    pub fn with_min_order_amount(mut self, amount: Decimal) -> Self { self.min_order_amount = Some(amount); self }
    pub fn with_max_discount_amount(mut self, amount: Decimal) -> Self { self.max_discount_amount = Some(amount); self }
    pub fn with_scope(mut self, scope: CouponScope) -> Self { self.scope = scope; self }
    pub fn with_max_uses(mut self, max_uses: u32) -> Self { self.max_uses = Some(max_uses); self }
    pub fn with_used_count(mut self, used_count: u32) -> Self { self.used_count = used_count; self }
    pub fn with_window(mut self, window: ValidityWindow) -> Self { self.window = window; self }
    pub fn single_use(mut self) -> Self { self.is_single_use = true; self }
    pub fn first_time_only(mut self) -> Self { self.first_time_only = true; self }
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }
    pub fn inactive(mut self) -> Self { self.is_active = false; self }

    pub fn id(&self) -> Option<u64> { self.id }
    pub fn code(&self) -> &CouponCode { &self.code }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn rule(&self) -> CouponRule { self.rule }
    pub fn coupon_type(&self) -> CouponType { self.rule.coupon_type() }
    pub fn min_order_amount(&self) -> Option<Decimal> { self.min_order_amount }
    pub fn max_discount_amount(&self) -> Option<Decimal> { self.max_discount_amount }
    pub fn scope(&self) -> &CouponScope { &self.scope }
    pub fn is_single_use(&self) -> bool { self.is_single_use }
    pub fn max_uses(&self) -> Option<u32> { self.max_uses }
    pub fn is_first_time_only(&self) -> bool { self.first_time_only }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn waives_shipping(&self) -> bool { matches!(self.rule, CouponRule::FreeShipping) }

    /// Minimum order amount and scope lists, exclusions first.
    pub fn order_rejection(&self, order_amount: &Money, product_ids: &BTreeSet<ProductId>, category_ids: &BTreeSet<CategoryId>) -> Option<Ineligibility> {
        if let Some(minimum) = self.min_order_amount {
            if order_amount.amount() < minimum {
                return Some(Ineligibility::BelowMinimumOrder { minimum });
            }
        }
        self.scope.rejection(product_ids, category_ids)
    }

    pub fn is_applicable_to_order(&self, order_amount: &Money, product_ids: &BTreeSet<ProductId>, category_ids: &BTreeSet<CategoryId>) -> bool {
        self.order_rejection(order_amount, product_ids, category_ids).is_none()
    }

    /// Discount on `order_amount`, capped by `max_discount_amount` and never above the order amount.
    pub fn calculate_discount(&self, order_amount: &Money) -> Money {
        let raw = match self.rule {
            CouponRule::Percentage(percent) => order_amount.percentage(percent).amount(),
            CouponRule::Fixed(amount) => amount,
            CouponRule::FreeShipping => Decimal::ZERO,
        };
        clamp_discount(raw, self.max_discount_amount, order_amount)
    }

    /// Records one redemption. Performs no eligibility checks.
    pub fn increment_usage(&self, now: DateTime<Utc>) -> Coupon {
        Coupon { used_count: self.used_count.saturating_add(1), updated_at: now, ..self.clone() }
    }

    pub fn activate(&self, now: DateTime<Utc>) -> Coupon { Coupon { is_active: true, updated_at: now, ..self.clone() } }
    pub fn deactivate(&self, now: DateTime<Utc>) -> Coupon { Coupon { is_active: false, updated_at: now, ..self.clone() } }
}

impl Promotion for Coupon {
    fn is_active(&self) -> bool { self.is_active }
    fn window(&self) -> &ValidityWindow { &self.window }

    /// `is_single_use` is a per-customer rule and does not cap global usage.
    fn usage_cap(&self) -> Option<u32> { self.max_uses }

    fn used_count(&self) -> u32 { self.used_count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() }
    fn usd(amount: Decimal) -> Money { Money::usd(amount).unwrap() }
    fn ids<T: Ord>(items: impl IntoIterator<Item = T>) -> BTreeSet<T> { items.into_iter().collect() }

    fn percent_coupon(value: Decimal) -> Coupon {
        Coupon::new(CouponCode::new("save").unwrap(), CouponRule::from_parts(CouponType::Percentage, value).unwrap(), now())
    }

    #[test]
    fn test_percentage_discount_is_capped() {
        let coupon = percent_coupon(dec!(10)).with_max_discount_amount(dec!(25));
        assert_eq!(coupon.calculate_discount(&usd(dec!(300))).amount(), dec!(25));
        assert_eq!(coupon.calculate_discount(&usd(dec!(100))).amount(), dec!(10));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_order() {
        let coupon = Coupon::new(CouponCode::new("flat15").unwrap(), CouponRule::Fixed(dec!(15)), now());
        assert_eq!(coupon.calculate_discount(&usd(dec!(10))).amount(), dec!(10));
        assert_eq!(coupon.calculate_discount(&usd(dec!(40))).amount(), dec!(15));
    }

    #[test]
    fn test_free_shipping_has_no_goods_discount() {
        let coupon = Coupon::new(CouponCode::new("shipfree").unwrap(), CouponRule::FreeShipping, now());
        assert!(coupon.calculate_discount(&usd(dec!(80))).is_zero());
        assert!(coupon.waives_shipping());
    }

    #[test]
    fn test_rule_from_parts_validates_value() {
        assert!(CouponRule::from_parts(CouponType::Percentage, dec!(101)).is_err());
        assert!(CouponRule::from_parts(CouponType::Fixed, dec!(-1)).is_err());
        assert_eq!(CouponRule::from_parts(CouponType::FreeShipping, dec!(5)).unwrap().value(), dec!(0));
        assert!("bogus".parse::<CouponType>().is_err());
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let scope = CouponScope {
            applicable_products: ids([ProductId(1), ProductId(2)]),
            excluded_products: ids([ProductId(1)]),
            ..CouponScope::default()
        };
        let coupon = percent_coupon(dec!(10)).with_scope(scope);
        let amount = usd(dec!(50));
        assert_eq!(
            coupon.order_rejection(&amount, &ids([ProductId(1)]), &BTreeSet::new()),
            Some(Ineligibility::ExcludedProduct { product_id: ProductId(1) })
        );
        assert!(coupon.is_applicable_to_order(&amount, &ids([ProductId(2)]), &BTreeSet::new()));
        assert!(!coupon.is_applicable_to_order(&amount, &ids([ProductId(1), ProductId(2)]), &BTreeSet::new()));
        assert!(!coupon.is_applicable_to_order(&amount, &ids([ProductId(3)]), &BTreeSet::new()));
    }

    #[test]
    fn test_category_scope() {
        let scope = CouponScope {
            applicable_categories: ids([CategoryId(7)]),
            excluded_categories: ids([CategoryId(9)]),
            ..CouponScope::default()
        };
        let coupon = percent_coupon(dec!(10)).with_scope(scope);
        let amount = usd(dec!(50));
        assert!(coupon.is_applicable_to_order(&amount, &BTreeSet::new(), &ids([CategoryId(7), CategoryId(8)])));
        assert_eq!(
            coupon.order_rejection(&amount, &BTreeSet::new(), &ids([CategoryId(7), CategoryId(9)])),
            Some(Ineligibility::ExcludedCategory { category_id: CategoryId(9) })
        );
        assert_eq!(coupon.order_rejection(&amount, &BTreeSet::new(), &ids([CategoryId(8)])), Some(Ineligibility::NoApplicableCategory));
    }

    #[test]
    fn test_minimum_order_amount() {
        let coupon = percent_coupon(dec!(10)).with_min_order_amount(dec!(50));
        assert_eq!(
            coupon.order_rejection(&usd(dec!(49.99)), &BTreeSet::new(), &BTreeSet::new()),
            Some(Ineligibility::BelowMinimumOrder { minimum: dec!(50) })
        );
        assert!(coupon.is_applicable_to_order(&usd(dec!(50)), &BTreeSet::new(), &BTreeSet::new()));
    }

    #[test]
    fn test_end_date_controls_usability() {
        let yesterday = ValidityWindow::new(None, Some(now() - Duration::days(1))).unwrap();
        let tomorrow = ValidityWindow::new(None, Some(now() + Duration::days(1))).unwrap();
        let coupon = percent_coupon(dec!(5)).inactive();
        assert!(!coupon.clone().with_window(yesterday).activate(now()).can_be_used(now()));
        assert!(coupon.with_window(tomorrow).activate(now()).can_be_used(now()));
    }

    #[test]
    fn test_usage_cap_reached_after_n_redemptions() {
        let mut coupon = percent_coupon(dec!(5)).with_max_uses(3);
        for _ in 0..3 {
            assert!(coupon.can_be_used(now()));
            coupon = coupon.increment_usage(now());
        }
        assert_eq!(coupon.used_count(), 3);
        assert!(!coupon.can_be_used(now()));
    }

    #[test]
    fn test_single_use_does_not_cap_global_usage() {
        let coupon = percent_coupon(dec!(5)).single_use().with_max_uses(100).with_used_count(1);
        assert!(coupon.is_single_use());
        assert_eq!(coupon.usage_cap(), Some(100));
        assert!(coupon.can_be_used(now()));
        assert_eq!(coupon.remaining_uses(), Some(99));

        let uncapped = percent_coupon(dec!(5)).single_use().with_used_count(7);
        assert_eq!(uncapped.usage_cap(), None);
        assert!(uncapped.can_be_used(now()));
    }

    #[test]
    fn test_increment_stamps_updated_at_only() {
        let coupon = percent_coupon(dec!(5));
        let later = now() + Duration::hours(1);
        let used = coupon.increment_usage(later);
        assert_eq!(used.updated_at(), later);
        assert_eq!(used.created_at(), coupon.created_at());
        assert_eq!(coupon.used_count(), 0);
    }
}
