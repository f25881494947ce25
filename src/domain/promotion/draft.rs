//! Admin-supplied promotion drafts, validated before they become coupons or offers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::{Validate, ValidationError};

use super::{Coupon, CouponRule, CouponScope, CouponType, Offer, OfferType, ValidityWindow};
use crate::domain::time::timestamp;
use crate::domain::value_objects::{CategoryId, CouponCode, InvalidValue, Percent, ProductId};

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "check_coupon_draft", skip_on_field_errors = false))]
pub struct NewCoupon {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    #[validate(custom = "non_negative")]
    pub value: Decimal,
    #[validate(custom = "non_negative")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(default)]
    pub applicable_products: BTreeSet<ProductId>,
    #[serde(default)]
    pub applicable_categories: BTreeSet<CategoryId>,
    #[serde(default)]
    pub excluded_products: BTreeSet<ProductId>,
    #[serde(default)]
    pub excluded_categories: BTreeSet<CategoryId>,
    #[serde(default)]
    pub is_single_use: bool,
    #[validate(range(min = 1))]
    pub max_uses: Option<u32>,
    #[serde(default, with = "timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_time_only: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewCoupon {
    /// Builds the coupon. Call `validate` first; this only re-checks what the types demand.
    pub fn into_coupon(self, now: DateTime<Utc>) -> Result<Coupon, InvalidValue> {
        let rule = CouponRule::from_parts(self.coupon_type, self.value)?;
        let window = ValidityWindow::new(self.start_date, self.end_date)?;
        let scope = CouponScope {
            applicable_products: self.applicable_products,
            applicable_categories: self.applicable_categories,
            excluded_products: self.excluded_products,
            excluded_categories: self.excluded_categories,
        };
        let mut coupon = Coupon::new(CouponCode::new(self.code)?, rule, now).with_scope(scope).with_window(window);
        if let Some(description) = self.description { coupon = coupon.with_description(description); }
        if let Some(amount) = self.min_order_amount { coupon = coupon.with_min_order_amount(amount); }
        if let Some(amount) = self.max_discount_amount { coupon = coupon.with_max_discount_amount(amount); }
        if let Some(max_uses) = self.max_uses { coupon = coupon.with_max_uses(max_uses); }
        if self.is_single_use { coupon = coupon.single_use(); }
        if self.first_time_only { coupon = coupon.first_time_only(); }
        if !self.is_active { coupon = coupon.inactive(); }
        Ok(coupon)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "check_offer_draft", skip_on_field_errors = false))]
pub struct NewOffer {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    #[validate(custom = "percent_range")]
    pub discount_percent: Decimal,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    #[validate(custom = "non_negative")]
    pub min_order_amount: Option<Decimal>,
    #[validate(custom = "non_negative")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(default)]
    pub is_limited: bool,
    #[validate(range(min = 1))]
    pub max_uses: Option<u32>,
    #[serde(default, with = "timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub conditions: Option<serde_json::Value>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewOffer {
    pub fn into_offer(self, now: DateTime<Utc>) -> Result<Offer, InvalidValue> {
        let window = ValidityWindow::new(self.start_date, self.end_date)?;
        let mut offer = Offer::new(self.title, self.offer_type, Percent::new(self.discount_percent)?, now)
            .limited(self.is_limited, self.max_uses)
            .with_window(window);
        if let Some(description) = self.description { offer = offer.with_description(description); }
        if let Some(product_id) = self.product_id { offer = offer.for_product(product_id); }
        if let Some(category_id) = self.category_id { offer = offer.for_category(category_id); }
        if let Some(amount) = self.min_order_amount { offer = offer.with_min_order_amount(amount); }
        if let Some(amount) = self.max_discount_amount { offer = offer.with_max_discount_amount(amount); }
        if let Some(conditions) = self.conditions { offer = offer.with_conditions(conditions); }
        if !self.is_active { offer = offer.inactive(); }
        Ok(offer)
    }
}

fn default_active() -> bool {
    true
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

fn percent_range(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percent_out_of_range"));
    }
    Ok(())
}

fn check_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(ValidationError::new("start_after_end")),
        _ => Ok(()),
    }
}

fn check_coupon_draft(draft: &NewCoupon) -> Result<(), ValidationError> {
    if draft.coupon_type == CouponType::Percentage {
        percent_range(&draft.value)?;
    }
    if CouponCode::new(draft.code.as_str()).is_err() {
        return Err(ValidationError::new("blank_code"));
    }
    check_window(draft.start_date, draft.end_date)
}

fn check_offer_draft(draft: &NewOffer) -> Result<(), ValidationError> {
    if draft.product_id.is_some() && draft.category_id.is_some() {
        return Err(ValidationError::new("product_and_category"));
    }
    check_window(draft.start_date, draft.end_date)
}
