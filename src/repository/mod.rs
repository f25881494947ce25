//! Persistence boundary for orders, coupons and offers.
//!
//! Implementations store whole entities with upsert semantics. Locking for
//! check-then-redeem is not provided here; see `service::CheckoutService`.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;

use crate::domain::aggregates::Order;
use crate::domain::promotion::{Coupon, Offer};
use crate::domain::value_objects::{CouponCode, OfferId, OrderId};
use crate::Result;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Upserts the order, assigning an id on first save. Returns the stored order.
    async fn save_order(&self, order: &Order) -> Result<Order>;
}

#[async_trait]
pub trait PromotionRepository: Send + Sync {
    /// Codes are normalised, so lookup is case-insensitive.
    async fn find_coupon(&self, code: &CouponCode) -> Result<Option<Coupon>>;

    async fn save_coupon(&self, coupon: &Coupon) -> Result<Coupon>;

    async fn find_offer(&self, id: OfferId) -> Result<Option<Offer>>;

    async fn list_offers(&self) -> Result<Vec<Offer>>;

    async fn save_offer(&self, offer: &Offer) -> Result<Offer>;
}
