//! Offer aggregate: an admin-curated discount scoped to at most one product or category.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{clamp_discount, Promotion, ValidityWindow};
use crate::domain::value_objects::{CategoryId, InvalidValue, Money, OfferId, Percent, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType { Flash, Weekend, Clearance, Student, New }

impl OfferType {
    pub const ALL: [OfferType; 5] = [Self::Flash, Self::Weekend, Self::Clearance, Self::Student, Self::New];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Weekend => "weekend",
            Self::Clearance => "clearance",
            Self::Student => "student",
            Self::New => "new",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OfferType {
    type Err = InvalidValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| InvalidValue::new("offer type", s))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Offer {
    id: Option<OfferId>,
    title: String,
    description: Option<String>,
    offer_type: OfferType,
    discount_percent: Percent,
    product_id: Option<ProductId>,
    category_id: Option<CategoryId>,
    min_order_amount: Option<Decimal>,
    max_discount_amount: Option<Decimal>,
    is_limited: bool,
    max_uses: Option<u32>,
    used_count: u32,
    window: ValidityWindow,
    /// Display-only extras; never interpreted here.
    conditions: Option<serde_json::Value>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(title: impl Into<String>, offer_type: OfferType, discount_percent: Percent, now: DateTime<Utc>) -> Self {
        Self {
            id: None, title: title.into(), description: None, offer_type, discount_percent,
            product_id: None, category_id: None, min_order_amount: None, max_discount_amount: None,
            is_limited: false, max_uses: None, used_count: 0, window: ValidityWindow::UNBOUNDED,
            conditions: None, is_active: true, created_at: now, updated_at: now,
        }
    }

    pub fn with_id(mut self, id: OfferId) -> Self { self.id = Some(id); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = Some(description.into()); self }
    pub fn for_product(mut self, product_id: ProductId) -> Self { self.product_id = Some(product_id); self }
    pub fn for_category(mut self, category_id: CategoryId) -> Self { self.category_id = Some(category_id); self }
    pub fn with_min_order_amount(mut self, amount: Decimal) -> Self { self.min_order_amount = Some(amount); self }
    pub fn with_max_discount_amount(mut self, amount: Decimal) -> Self { self.max_discount_amount = Some(amount); self }
    /// Sets the usage limit; `max_uses` only counts while `is_limited` is set.
    pub fn limited(mut self, is_limited: bool, max_uses: Option<u32>) -> Self { self.is_limited = is_limited; self.max_uses = max_uses; self }
    pub fn with_used_count(mut self, used_count: u32) -> Self { self.used_count = used_count; self }
    pub fn with_window(mut self, window: ValidityWindow) -> Self { self.window = window; self }
    pub fn with_conditions(mut self, conditions: serde_json::Value) -> Self { self.conditions = Some(conditions); self }
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }
    pub fn inactive(mut self) -> Self { self.is_active = false; self }

    pub fn id(&self) -> Option<OfferId> { self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn offer_type(&self) -> OfferType { self.offer_type }
    pub fn discount_percent(&self) -> Percent { self.discount_percent }
    pub fn product_id(&self) -> Option<ProductId> { self.product_id }
    pub fn category_id(&self) -> Option<CategoryId> { self.category_id }
    pub fn min_order_amount(&self) -> Option<Decimal> { self.min_order_amount }
    pub fn max_discount_amount(&self) -> Option<Decimal> { self.max_discount_amount }
    pub fn is_limited(&self) -> bool { self.is_limited }
    pub fn max_uses(&self) -> Option<u32> { self.max_uses }
    pub fn conditions(&self) -> Option<&serde_json::Value> { self.conditions.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// An offer with neither a product nor a category applies to everything.
    pub fn is_applicable_to_product(&self, product_id: ProductId, category_id: Option<CategoryId>) -> bool {
        let product_ok = self.product_id.map_or(true, |p| p == product_id);
        let category_ok = self.category_id.map_or(true, |c| Some(c) == category_id);
        product_ok && category_ok
    }

    pub fn meets_minimum(&self, order_amount: &Money) -> bool {
        self.min_order_amount.map_or(true, |minimum| order_amount.amount() >= minimum)
    }

    pub fn calculate_discount(&self, order_amount: &Money) -> Money {
        let raw = order_amount.percentage(self.discount_percent).amount();
        clamp_discount(raw, self.max_discount_amount, order_amount)
    }

    /// Records one redemption. Performs no eligibility checks.
    pub fn increment_usage(&self, now: DateTime<Utc>) -> Offer {
        Offer { used_count: self.used_count.saturating_add(1), updated_at: now, ..self.clone() }
    }

    pub fn activate(&self, now: DateTime<Utc>) -> Offer { Offer { is_active: true, updated_at: now, ..self.clone() } }
    pub fn deactivate(&self, now: DateTime<Utc>) -> Offer { Offer { is_active: false, updated_at: now, ..self.clone() } }
}

impl Promotion for Offer {
    fn is_active(&self) -> bool { self.is_active }
    fn window(&self) -> &ValidityWindow { &self.window }
    fn usage_cap(&self) -> Option<u32> { if self.is_limited { self.max_uses } else { None } }
    fn used_count(&self) -> u32 { self.used_count }
}
