//! Order Aggregate
//!
//! The order lifecycle is a pair of status axes. Fulfilment status follows a
//! fixed graph:
//!
//! ```text
//! pending -> processing -> shipped -> delivered -> returned
//! pending -> cancelled
//! processing -> cancelled
//! ```
//!
//! Payment status may move freely between its five values. Every operation
//! takes the receiver by reference and returns a new `Order`; a failed
//! operation leaves nothing changed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{InvalidValue, Money, MoneyError, OrderId, OrderNumber, ProductId};

#[derive(Clone, Debug)]
pub struct Order {
    id: Option<OrderId>,
    order_number: OrderNumber,
    customer_id: Option<u64>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    items: Vec<LineItem>,
    amounts: OrderAmounts,
    shipping_address: Option<Address>,
    billing_address: Option<Address>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    return_requested_at: Option<DateTime<Utc>>,
    return_completed_at: Option<DateTime<Utc>>,
    events: Vec<DomainEvent>,
}

/// Snapshot of a product taken when the order is placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: ProductId, name: impl Into<String>, sku: impl Into<String>, unit_price: Money, quantity: u32) -> Result<Self, InvalidValue> {
        if quantity == 0 { return Err(InvalidValue::new("quantity", quantity)); }
        Ok(Self { product_id, name: name.into(), sku: sku.into(), unit_price, quantity })
    }
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address { pub name: String, pub street1: String, pub street2: Option<String>, pub city: String, pub state: Option<String>, pub zip: String, pub country: String }

/// Monetary fields of an order. The total is stored as supplied and is not
/// reconciled against the other fields unless `Order::recalculate_total` is called.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderAmounts {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl OrderAmounts {
    /// Builds amounts with `total = subtotal - discount + tax + shipping`, floored at zero.
    pub fn from_parts(subtotal: Money, tax_amount: Money, shipping_cost: Money, discount_amount: Money) -> Result<Self, MoneyError> {
        let mut amounts = Self { total_amount: Money::zero(subtotal.currency()), subtotal, tax_amount, shipping_cost, discount_amount };
        amounts.total_amount = amounts.computed_total()?;
        Ok(amounts)
    }

    pub fn computed_total(&self) -> Result<Money, MoneyError> {
        self.subtotal.saturating_sub(&self.discount_amount)?.add(&self.tax_amount)?.add(&self.shipping_cost)
    }

    pub fn currency(&self) -> &str { self.subtotal.currency() }

    fn check_currency(&self) -> Result<(), MoneyError> {
        for other in [&self.tax_amount, &self.shipping_cost, &self.discount_amount, &self.total_amount] {
            self.subtotal.add(other)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled, Returned }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled, Self::Returned];

    /// Statuses reachable in one step.
    pub fn successors(self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Processing, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered],
            Self::Delivered => &[Self::Returned],
            Self::Cancelled | Self::Returned => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool { self.successors().contains(&next) }
    pub fn is_terminal(self) -> bool { self.successors().is_empty() }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = InvalidValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or_else(|| InvalidValue::new("status", s))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded, PartiallyRefunded }

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [Self::Pending, Self::Paid, Self::Failed, Self::Refunded, Self::PartiallyRefunded];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = InvalidValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or_else(|| InvalidValue::new("payment_status", s))
    }
}

/// How long after delivery an order may still be returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReturnPolicy { window_days: u32 }

impl ReturnPolicy {
    pub const DEFAULT_WINDOW_DAYS: u32 = 30;

    pub fn new(window_days: u32) -> Self { Self { window_days } }
    pub fn window_days(&self) -> u32 { self.window_days }

    /// Elapsed time counts whole days, so the window closes when day `window_days + 1` begins.
    pub fn allows(&self, delivered_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - delivered_at).num_days() <= i64::from(self.window_days)
    }
}

impl Default for ReturnPolicy { fn default() -> Self { Self::new(Self::DEFAULT_WINDOW_DAYS) } }

/// Fields needed to rebuild an order that already exists in storage.
#[derive(Clone, Debug)]
pub struct OrderSnapshot {
    pub id: Option<OrderId>,
    pub order_number: OrderNumber,
    pub customer_id: Option<u64>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items: Vec<LineItem>,
    pub amounts: OrderAmounts,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub return_requested_at: Option<DateTime<Utc>>,
    pub return_completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn place(order_number: OrderNumber, items: Vec<LineItem>, amounts: OrderAmounts, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::EmptyOrder); }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(InvalidValue::new("quantity", item.quantity).into());
        }
        amounts.check_currency()?;
        let event = DomainEvent::Order(OrderEvent::Placed { order_number: order_number.clone(), total: amounts.total_amount.clone() });
        Ok(Self {
            id: None, order_number, customer_id: None,
            status: OrderStatus::Pending, payment_status: PaymentStatus::Pending,
            items, amounts, shipping_address: None, billing_address: None, notes: None,
            created_at: now, updated_at: now,
            shipped_at: None, delivered_at: None, cancelled_at: None, return_requested_at: None, return_completed_at: None,
            events: vec![event],
        })
    }

    pub fn restore(snapshot: OrderSnapshot) -> Result<Self, OrderError> {
        if snapshot.items.is_empty() { return Err(OrderError::EmptyOrder); }
        snapshot.amounts.check_currency()?;
        Ok(Self {
            id: snapshot.id, order_number: snapshot.order_number, customer_id: snapshot.customer_id,
            status: snapshot.status, payment_status: snapshot.payment_status,
            items: snapshot.items, amounts: snapshot.amounts,
            shipping_address: snapshot.shipping_address, billing_address: snapshot.billing_address, notes: snapshot.notes,
            created_at: snapshot.created_at, updated_at: snapshot.updated_at,
            shipped_at: snapshot.shipped_at, delivered_at: snapshot.delivered_at, cancelled_at: snapshot.cancelled_at,
            return_requested_at: snapshot.return_requested_at, return_completed_at: snapshot.return_completed_at,
            events: vec![],
        })
    }

    pub fn with_customer(mut self, customer_id: u64) -> Self { self.customer_id = Some(customer_id); self }
    pub fn with_addresses(mut self, shipping: Option<Address>, billing: Option<Address>) -> Self {
        self.shipping_address = shipping;
        self.billing_address = billing;
        self
    }
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self { self.notes = Some(notes.into()); self }

    /// Assigns the storage identity. Existing identities are kept.
    pub fn with_id(mut self, id: OrderId) -> Self { self.id.get_or_insert(id); self }

    pub fn id(&self) -> Option<OrderId> { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn customer_id(&self) -> Option<u64> { self.customer_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn amounts(&self) -> &OrderAmounts { &self.amounts }
    pub fn shipping_address(&self) -> Option<&Address> { self.shipping_address.as_ref() }
    pub fn billing_address(&self) -> Option<&Address> { self.billing_address.as_ref() }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn shipped_at(&self) -> Option<DateTime<Utc>> { self.shipped_at }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> { self.cancelled_at }
    pub fn return_requested_at(&self) -> Option<DateTime<Utc>> { self.return_requested_at }
    pub fn return_completed_at(&self) -> Option<DateTime<Utc>> { self.return_completed_at }

    /// Moves along one edge of the status graph, stamping the milestone for the new status.
    pub fn transition_status(&self, to: OrderStatus, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from, to });
        }
        Ok(self.apply(now, |order| {
            order.status = to;
            let milestone = match to {
                OrderStatus::Shipped => Some(&mut order.shipped_at),
                OrderStatus::Delivered => Some(&mut order.delivered_at),
                OrderStatus::Cancelled => Some(&mut order.cancelled_at),
                OrderStatus::Returned => Some(&mut order.return_completed_at),
                OrderStatus::Pending | OrderStatus::Processing => None,
            };
            if let Some(slot) = milestone { slot.get_or_insert(now); }
            Some(OrderEvent::StatusChanged { order_number: order.order_number.clone(), from, to, at: now })
        }))
    }

    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if !self.can_be_cancelled() {
            return Err(OrderError::IllegalState { operation: "cancel", status: self.status, reason: "only pending or processing orders can be cancelled" });
        }
        self.transition_status(OrderStatus::Cancelled, now)
    }

    pub fn request_return(&self, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::IllegalState { operation: "request return", status: self.status, reason: "order has not been delivered" });
        }
        if self.return_requested_at.is_some() {
            return Err(OrderError::IllegalState { operation: "request return", status: self.status, reason: "a return was already requested" });
        }
        Ok(self.apply(now, |order| {
            order.return_requested_at = Some(now);
            Some(OrderEvent::ReturnRequested { order_number: order.order_number.clone(), at: now })
        }))
    }

    pub fn complete_return(&self, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if self.return_requested_at.is_none() {
            return Err(OrderError::IllegalState { operation: "complete return", status: self.status, reason: "no return was requested" });
        }
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::IllegalState { operation: "complete return", status: self.status, reason: "order is not awaiting a return" });
        }
        self.transition_status(OrderStatus::Returned, now)
    }

    /// Any payment status may follow any other.
    pub fn transition_payment_status(&self, to: PaymentStatus, now: DateTime<Utc>) -> Order {
        let from = self.payment_status;
        self.apply(now, |order| {
            order.payment_status = to;
            Some(OrderEvent::PaymentStatusChanged { order_number: order.order_number.clone(), from, to })
        })
    }

    /// Records a promotional discount, clamped to the subtotal. The total is left alone.
    pub fn apply_discount(&self, discount: &Money, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let clamped = Money::zero(self.amounts.currency()).add(discount)?.clamp_to(self.amounts.subtotal.amount());
        Ok(self.apply(now, |order| {
            order.amounts.discount_amount = clamped.clone();
            Some(OrderEvent::DiscountApplied { order_number: order.order_number.clone(), discount: clamped })
        }))
    }

    /// Zeroes the shipping cost, as a free-shipping coupon requires.
    pub fn waive_shipping(&self, now: DateTime<Utc>) -> Order {
        self.apply(now, |order| {
            order.amounts.shipping_cost = Money::zero(order.amounts.currency());
            Some(OrderEvent::ShippingWaived { order_number: order.order_number.clone() })
        })
    }

    pub fn recalculate_total(&self, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let total = self.amounts.computed_total()?;
        Ok(self.apply(now, |order| { order.amounts.total_amount = total; None }))
    }

    pub fn can_be_cancelled(&self) -> bool { matches!(self.status, OrderStatus::Pending | OrderStatus::Processing) }
    pub fn can_be_shipped(&self) -> bool { self.status == OrderStatus::Processing && self.is_paid() }
    pub fn can_be_delivered(&self) -> bool { self.status == OrderStatus::Shipped }
    pub fn can_be_refunded(&self) -> bool { self.is_paid() }
    pub fn is_paid(&self) -> bool { self.payment_status == PaymentStatus::Paid }

    pub fn can_be_returned(&self, now: DateTime<Utc>) -> bool { self.can_be_returned_under(&ReturnPolicy::default(), now) }

    pub fn can_be_returned_under(&self, policy: &ReturnPolicy, now: DateTime<Utc>) -> bool {
        match (self.status, self.delivered_at) {
            (OrderStatus::Delivered, Some(delivered_at)) => policy.allows(delivered_at, now),
            _ => false,
        }
    }

    pub fn return_deadline(&self, policy: &ReturnPolicy) -> Option<DateTime<Utc>> {
        self.delivered_at.map(|at| at + Duration::days(i64::from(policy.window_days()) + 1))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    /// Clones, applies `change`, stamps `updated_at` and records the event it returns.
    fn apply(&self, now: DateTime<Utc>, change: impl FnOnce(&mut Order) -> Option<OrderEvent>) -> Order {
        let mut next = self.clone();
        if let Some(event) = change(&mut next) {
            next.events.push(DomainEvent::Order(event));
        }
        next.updated_at = now;
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("cannot {operation} order in status {status}: {reason}")]
    IllegalState { operation: &'static str, status: OrderStatus, reason: &'static str },
    #[error("order has no items")]
    EmptyOrder,
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
    #[error(transparent)]
    Money(#[from] MoneyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() }

    fn usd(amount: rust_decimal::Decimal) -> Money { Money::usd(amount).unwrap() }

    fn order() -> Order {
        let item = LineItem::new(ProductId(1), "Widget", "W001", usd(dec!(10)), 2).unwrap();
        let amounts = OrderAmounts::from_parts(usd(dec!(20)), usd(dec!(2)), usd(dec!(5)), usd(dec!(0))).unwrap();
        Order::place(OrderNumber::new("ORD-1001").unwrap(), vec![item], amounts, t0()).unwrap()
    }

    fn delivered() -> Order {
        order()
            .transition_status(OrderStatus::Processing, t0()).unwrap()
            .transition_status(OrderStatus::Shipped, t0() + Duration::days(1)).unwrap()
            .transition_status(OrderStatus::Delivered, t0() + Duration::days(3)).unwrap()
    }

    #[test]
    fn test_order_workflow() {
        let placed = order();
        assert_eq!(placed.status(), OrderStatus::Pending);
        assert_eq!(placed.amounts().total_amount.amount(), dec!(27));
        let order = delivered();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.shipped_at(), Some(t0() + Duration::days(1)));
        assert_eq!(order.delivered_at(), Some(t0() + Duration::days(3)));
        assert_eq!(order.updated_at(), t0() + Duration::days(3));
        assert_eq!(placed.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_place_rejects_empty_order() {
        let amounts = OrderAmounts::from_parts(usd(dec!(0)), usd(dec!(0)), usd(dec!(0)), usd(dec!(0))).unwrap();
        let err = Order::place(OrderNumber::new("ORD-1").unwrap(), vec![], amounts, t0()).unwrap_err();
        assert_eq!(err, OrderError::EmptyOrder);
        assert!(LineItem::new(ProductId(1), "x", "x", usd(dec!(1)), 0).is_err());
    }

    #[test]
    fn test_illegal_edges_leave_order_unchanged() {
        let placed = order();
        for to in [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Delivered, OrderStatus::Returned] {
            let err = placed.transition_status(to, t0() + Duration::hours(1)).unwrap_err();
            assert_eq!(err, OrderError::InvalidTransition { from: OrderStatus::Pending, to });
        }
        assert_eq!(placed.updated_at(), t0());
        assert!(placed.shipped_at().is_none());
    }

    #[test]
    fn test_repeated_transition_does_not_overwrite_milestone() {
        let shipped = order()
            .transition_status(OrderStatus::Processing, t0()).unwrap()
            .transition_status(OrderStatus::Shipped, t0() + Duration::days(1)).unwrap();
        let err = shipped.transition_status(OrderStatus::Shipped, t0() + Duration::days(2)).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(shipped.shipped_at(), Some(t0() + Duration::days(1)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Returned.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_cancel() {
        let cancelled = order().cancel(t0() + Duration::hours(2)).unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at(), Some(t0() + Duration::hours(2)));

        let processing = order().transition_status(OrderStatus::Processing, t0()).unwrap();
        assert!(processing.cancel(t0()).is_ok());

        let err = delivered().cancel(t0()).unwrap_err();
        assert!(matches!(err, OrderError::IllegalState { operation: "cancel", status: OrderStatus::Delivered, .. }));
    }

    #[test]
    fn test_return_flow() {
        let order = delivered();
        let requested = order.request_return(t0() + Duration::days(5)).unwrap();
        assert_eq!(requested.status(), OrderStatus::Delivered);
        assert_eq!(requested.return_requested_at(), Some(t0() + Duration::days(5)));
        assert!(requested.request_return(t0() + Duration::days(6)).is_err());

        let returned = requested.complete_return(t0() + Duration::days(9)).unwrap();
        assert_eq!(returned.status(), OrderStatus::Returned);
        assert_eq!(returned.return_completed_at(), Some(t0() + Duration::days(9)));
        assert!(returned.complete_return(t0() + Duration::days(10)).is_err());
    }

    #[test]
    fn test_return_preconditions() {
        let err = order().request_return(t0()).unwrap_err();
        assert!(matches!(err, OrderError::IllegalState { operation: "request return", .. }));
        let err = delivered().complete_return(t0()).unwrap_err();
        assert!(matches!(err, OrderError::IllegalState { operation: "complete return", .. }));
    }

    #[test]
    fn test_return_window_counts_whole_days() {
        let order = delivered();
        let delivered_at = order.delivered_at().unwrap();
        assert!(order.can_be_returned(delivered_at + Duration::days(30)));
        assert!(order.can_be_returned(delivered_at + Duration::days(31) - Duration::seconds(1)));
        assert!(!order.can_be_returned(delivered_at + Duration::days(31)));
        assert!(!order.can_be_returned_under(&ReturnPolicy::new(7), delivered_at + Duration::days(8)));
        assert_eq!(order.return_deadline(&ReturnPolicy::default()), Some(delivered_at + Duration::days(31)));
    }

    #[test]
    fn test_can_be_returned_requires_delivered_status() {
        let shipped = order()
            .transition_status(OrderStatus::Processing, t0()).unwrap()
            .transition_status(OrderStatus::Shipped, t0()).unwrap();
        assert!(!shipped.can_be_returned(t0()));
    }

    #[test]
    fn test_payment_status_is_unconstrained() {
        let order = order();
        let paid = order.transition_payment_status(PaymentStatus::Paid, t0() + Duration::minutes(1));
        assert!(paid.is_paid());
        assert!(paid.can_be_refunded());
        let refunded = paid.transition_payment_status(PaymentStatus::Refunded, t0() + Duration::minutes(2));
        let back = refunded.transition_payment_status(PaymentStatus::Paid, t0() + Duration::minutes(3));
        assert_eq!(back.payment_status(), PaymentStatus::Paid);
        assert_eq!(back.updated_at(), t0() + Duration::minutes(3));
        assert!("bogus".parse::<PaymentStatus>().is_err());
        assert_eq!("partially_refunded".parse::<PaymentStatus>().unwrap(), PaymentStatus::PartiallyRefunded);
    }

    #[test]
    fn test_can_be_shipped_needs_payment() {
        let processing = order().transition_status(OrderStatus::Processing, t0()).unwrap();
        assert!(!processing.can_be_shipped());
        assert!(processing.transition_payment_status(PaymentStatus::Paid, t0()).can_be_shipped());
        assert!(!processing.can_be_delivered());
    }

    #[test]
    fn test_discount_and_shipping_waiver() {
        let order = order();
        let discounted = order.apply_discount(&usd(dec!(50)), t0()).unwrap();
        assert_eq!(discounted.amounts().discount_amount.amount(), dec!(20));
        assert_eq!(discounted.amounts().total_amount.amount(), dec!(27));
        let free = discounted.waive_shipping(t0()).recalculate_total(t0()).unwrap();
        assert!(free.amounts().shipping_cost.is_zero());
        assert_eq!(free.amounts().total_amount.amount(), dec!(2));
    }

    #[test]
    fn test_events_recorded() {
        let mut order = delivered();
        let events = order.take_events();
        assert_eq!(events.len(), 4);
        assert!(order.take_events().is_empty());
    }
}
