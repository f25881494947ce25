//! Flat records exchanged with storage and the admin UI.
//!
//! Keys are snake_case, timestamps use `Y-m-d H:i:s`, and scope lists are
//! carried as JSON text (`"[1,2]"`). Enum-valued columns stay strings here so
//! that an unknown value surfaces as [`InvalidValue`] when the record is
//! turned back into a domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::aggregates::{Address, LineItem, Order, OrderAmounts, OrderError, OrderSnapshot};
use crate::domain::promotion::{Coupon, CouponRule, CouponScope, Offer, Promotion, ValidityWindow};
use crate::domain::time::timestamp;
use crate::domain::value_objects::{CategoryId, CouponCode, InvalidValue, Money, OfferId, OrderId, OrderNumber, Percent, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub product_id: u64,
    pub product_name: String,
    pub product_sku: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Option<u64>,
    pub order_number: String,
    pub customer_id: Option<u64>,
    pub status: String,
    pub payment_status: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub return_requested_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub return_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItemRecord>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        let amounts = order.amounts();
        Self {
            id: order.id().map(|id| id.0),
            order_number: order.order_number().to_string(),
            customer_id: order.customer_id(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            currency: amounts.currency().to_string(),
            subtotal: amounts.subtotal.amount(),
            tax_amount: amounts.tax_amount.amount(),
            shipping_cost: amounts.shipping_cost.amount(),
            discount_amount: amounts.discount_amount.amount(),
            total_amount: amounts.total_amount.amount(),
            shipping_address: order.shipping_address().cloned(),
            billing_address: order.billing_address().cloned(),
            notes: order.notes().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            shipped_at: order.shipped_at(),
            delivered_at: order.delivered_at(),
            cancelled_at: order.cancelled_at(),
            return_requested_at: order.return_requested_at(),
            return_completed_at: order.return_completed_at(),
            items: order.items().iter().map(|item| OrderItemRecord {
                product_id: item.product_id.0,
                product_name: item.name.clone(),
                product_sku: item.sku.clone(),
                unit_price: item.unit_price.amount(),
                quantity: item.quantity,
                total_price: item.line_total().amount(),
            }).collect(),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = OrderError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let currency = record.currency.as_str();
        let items = record.items.into_iter()
            .map(|item| LineItem::new(ProductId(item.product_id), item.product_name, item.product_sku, Money::new(item.unit_price, currency)?, item.quantity))
            .collect::<Result<Vec<_>, InvalidValue>>()?;
        let amounts = OrderAmounts {
            subtotal: Money::new(record.subtotal, currency)?,
            tax_amount: Money::new(record.tax_amount, currency)?,
            shipping_cost: Money::new(record.shipping_cost, currency)?,
            discount_amount: Money::new(record.discount_amount, currency)?,
            total_amount: Money::new(record.total_amount, currency)?,
        };
        Order::restore(OrderSnapshot {
            id: record.id.map(OrderId),
            order_number: OrderNumber::new(record.order_number)?,
            customer_id: record.customer_id,
            status: record.status.parse()?,
            payment_status: record.payment_status.parse()?,
            items,
            amounts,
            shipping_address: record.shipping_address,
            billing_address: record.billing_address,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
            shipped_at: record.shipped_at,
            delivered_at: record.delivered_at,
            cancelled_at: record.cancelled_at,
            return_requested_at: record.return_requested_at,
            return_completed_at: record.return_completed_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub id: Option<u64>,
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub coupon_type: String,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub applicable_categories: Option<String>,
    pub applicable_products: Option<String>,
    pub excluded_categories: Option<String>,
    pub excluded_products: Option<String>,
    pub is_single_use: bool,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    #[serde(default, with = "timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub first_time_only: bool,
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Coupon> for CouponRecord {
    fn from(coupon: &Coupon) -> Self {
        let scope = coupon.scope();
        Self {
            id: coupon.id(),
            code: coupon.code().to_string(),
            description: coupon.description().map(str::to_string),
            coupon_type: coupon.coupon_type().to_string(),
            value: coupon.rule().value(),
            min_order_amount: coupon.min_order_amount(),
            max_discount_amount: coupon.max_discount_amount(),
            applicable_categories: Some(encode_ids(&scope.applicable_categories)),
            applicable_products: Some(encode_ids(&scope.applicable_products)),
            excluded_categories: Some(encode_ids(&scope.excluded_categories)),
            excluded_products: Some(encode_ids(&scope.excluded_products)),
            is_single_use: coupon.is_single_use(),
            max_uses: coupon.max_uses(),
            used_count: coupon.used_count(),
            start_date: coupon.window().start_date(),
            end_date: coupon.window().end_date(),
            first_time_only: coupon.is_first_time_only(),
            is_active: coupon.is_active(),
            created_at: coupon.created_at(),
            updated_at: coupon.updated_at(),
        }
    }
}

impl TryFrom<CouponRecord> for Coupon {
    type Error = InvalidValue;

    fn try_from(record: CouponRecord) -> Result<Self, Self::Error> {
        let rule = CouponRule::from_parts(record.coupon_type.parse()?, record.value)?;
        let scope = CouponScope {
            applicable_categories: decode_ids("applicable_categories", record.applicable_categories.as_deref())?,
            applicable_products: decode_ids("applicable_products", record.applicable_products.as_deref())?,
            excluded_categories: decode_ids("excluded_categories", record.excluded_categories.as_deref())?,
            excluded_products: decode_ids("excluded_products", record.excluded_products.as_deref())?,
        };
        let mut coupon = Coupon::new(CouponCode::new(record.code)?, rule, record.created_at)
            .with_scope(scope)
            .with_used_count(record.used_count)
            .with_window(ValidityWindow::new(record.start_date, record.end_date)?)
            .with_timestamps(record.created_at, record.updated_at);
        if let Some(id) = record.id { coupon = coupon.with_id(id); }
        if let Some(description) = record.description { coupon = coupon.with_description(description); }
        if let Some(amount) = record.min_order_amount { coupon = coupon.with_min_order_amount(non_negative("min_order_amount", amount)?); }
        if let Some(amount) = record.max_discount_amount { coupon = coupon.with_max_discount_amount(non_negative("max_discount_amount", amount)?); }
        if let Some(max_uses) = record.max_uses { coupon = coupon.with_max_uses(max_uses); }
        if record.is_single_use { coupon = coupon.single_use(); }
        if record.first_time_only { coupon = coupon.first_time_only(); }
        if !record.is_active { coupon = coupon.inactive(); }
        Ok(coupon)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub id: Option<u64>,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub offer_type: String,
    pub discount_percent: Decimal,
    pub product_id: Option<u64>,
    pub category_id: Option<u64>,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub is_limited: bool,
    pub max_uses: Option<u32>,
    pub used_count: u32,
    #[serde(default, with = "timestamp::option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub end_date: Option<DateTime<Utc>>,
    pub conditions: Option<String>,
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Offer> for OfferRecord {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id().map(|id| id.0),
            title: offer.title().to_string(),
            description: offer.description().map(str::to_string),
            offer_type: offer.offer_type().to_string(),
            discount_percent: offer.discount_percent().value(),
            product_id: offer.product_id().map(|id| id.0),
            category_id: offer.category_id().map(|id| id.0),
            min_order_amount: offer.min_order_amount(),
            max_discount_amount: offer.max_discount_amount(),
            is_limited: offer.is_limited(),
            max_uses: offer.max_uses(),
            used_count: offer.used_count(),
            start_date: offer.window().start_date(),
            end_date: offer.window().end_date(),
            conditions: offer.conditions().map(|c| c.to_string()),
            is_active: offer.is_active(),
            created_at: offer.created_at(),
            updated_at: offer.updated_at(),
        }
    }
}

impl TryFrom<OfferRecord> for Offer {
    type Error = InvalidValue;

    fn try_from(record: OfferRecord) -> Result<Self, Self::Error> {
        let mut offer = Offer::new(record.title, record.offer_type.parse()?, Percent::new(record.discount_percent)?, record.created_at)
            .limited(record.is_limited, record.max_uses)
            .with_used_count(record.used_count)
            .with_window(ValidityWindow::new(record.start_date, record.end_date)?)
            .with_timestamps(record.created_at, record.updated_at);
        if let Some(id) = record.id { offer = offer.with_id(OfferId(id)); }
        if let Some(description) = record.description { offer = offer.with_description(description); }
        if let Some(id) = record.product_id { offer = offer.for_product(ProductId(id)); }
        if let Some(id) = record.category_id { offer = offer.for_category(CategoryId(id)); }
        if let Some(amount) = record.min_order_amount { offer = offer.with_min_order_amount(non_negative("min_order_amount", amount)?); }
        if let Some(amount) = record.max_discount_amount { offer = offer.with_max_discount_amount(non_negative("max_discount_amount", amount)?); }
        if let Some(raw) = record.conditions.filter(|raw| !raw.trim().is_empty()) {
            let conditions = serde_json::from_str(&raw).map_err(|_| InvalidValue::new("conditions", &raw))?;
            offer = offer.with_conditions(conditions);
        }
        if !record.is_active { offer = offer.inactive(); }
        Ok(offer)
    }
}

fn encode_ids<T: Serialize>(ids: &BTreeSet<T>) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| String::from("[]"))
}

/// Accepts `null`, an empty string, or a JSON array of ids.
fn decode_ids<T: DeserializeOwned + Ord>(field: &'static str, raw: Option<&str>) -> Result<BTreeSet<T>, InvalidValue> {
    match raw.map(str::trim) {
        None | Some("") | Some("null") => Ok(BTreeSet::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|_| InvalidValue::new(field, raw)),
    }
}

fn non_negative(field: &'static str, amount: Decimal) -> Result<Decimal, InvalidValue> {
    if amount < Decimal::ZERO { return Err(InvalidValue::new(field, amount)); }
    Ok(amount)
}
