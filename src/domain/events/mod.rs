//! Domain events
use crate::domain::aggregates::{OrderStatus, PaymentStatus};
use crate::domain::value_objects::{CouponCode, Money, OfferId, OrderNumber};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
    Promotion(PromotionEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_number: OrderNumber, total: Money },
    StatusChanged { order_number: OrderNumber, from: OrderStatus, to: OrderStatus, at: DateTime<Utc> },
    PaymentStatusChanged { order_number: OrderNumber, from: PaymentStatus, to: PaymentStatus },
    ReturnRequested { order_number: OrderNumber, at: DateTime<Utc> },
    DiscountApplied { order_number: OrderNumber, discount: Money },
    ShippingWaived { order_number: OrderNumber },
}

#[derive(Clone, Debug, PartialEq)]
pub enum PromotionEvent {
    CouponRedeemed { code: CouponCode, used_count: u32 },
    OfferRedeemed { offer_id: OfferId, used_count: u32 },
}
