//! Checkout and back-office operations over the repositories.
//!
//! The domain checks and the usage increment are separate calls, and the
//! repositories only offer whole-entity upserts. Every read-modify-write in this
//! service (redemptions, order transitions, coupon toggles) therefore runs under
//! one write lock, so no save can overwrite a concurrent one with stale state.
//! The lock only covers this process; a shared database needs a row lock or
//! version check instead.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::domain::aggregates::{Order, OrderError, OrderStatus, PaymentStatus, ReturnPolicy};
use crate::domain::events::{DomainEvent, PromotionEvent};
use crate::domain::promotion::{
    best_offer, evaluate_coupon, evaluate_offer, Coupon, CouponEvaluation, NewCoupon, NewOffer, Offer, OfferEvaluation, OfferQuote,
    OrderContext, Promotion,
};
use crate::domain::time::Clock;
use crate::domain::value_objects::{CouponCode, OfferId, OrderId};
use crate::repository::{OrderRepository, PromotionRepository};
use crate::{EcommerceError, Result};

pub struct CheckoutService {
    orders: Arc<dyn OrderRepository>,
    promotions: Arc<dyn PromotionRepository>,
    clock: Arc<dyn Clock>,
    return_policy: ReturnPolicy,
    write_lock: Mutex<()>,
    outbox: Mutex<Vec<DomainEvent>>,
}

impl CheckoutService {
    pub fn new(orders: Arc<dyn OrderRepository>, promotions: Arc<dyn PromotionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orders,
            promotions,
            clock,
            return_policy: ReturnPolicy::default(),
            write_lock: Mutex::new(()),
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn with_return_policy(mut self, policy: ReturnPolicy) -> Self {
        self.return_policy = policy;
        self
    }

    // ========================================================================
    // Orders
    // ========================================================================

    pub async fn place_order(&self, order: Order) -> Result<Order> {
        let mut saved = self.orders.save_order(&order).await?;
        info!(order_number = %saved.order_number(), order_id = ?saved.id(), "order placed");
        self.publish(saved.take_events()).await;
        Ok(saved)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.orders.find_order(id).await?.ok_or(EcommerceError::OrderNotFound(id))
    }

    pub async fn change_status(&self, id: OrderId, to: OrderStatus) -> Result<Order> {
        self.update_order(id, "change status", |order, now| order.transition_status(to, now)).await
    }

    pub async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        self.update_order(id, "cancel", |order, now| order.cancel(now)).await
    }

    pub async fn request_return(&self, id: OrderId) -> Result<Order> {
        self.update_order(id, "request return", |order, now| order.request_return(now)).await
    }

    pub async fn complete_return(&self, id: OrderId) -> Result<Order> {
        self.update_order(id, "complete return", |order, now| order.complete_return(now)).await
    }

    pub async fn change_payment_status(&self, id: OrderId, to: PaymentStatus) -> Result<Order> {
        self.update_order(id, "change payment status", |order, now| Ok(order.transition_payment_status(to, now))).await
    }

    /// Whether the order is still inside the configured return window.
    pub async fn is_returnable(&self, id: OrderId) -> Result<bool> {
        let order = self.get_order(id).await?;
        Ok(order.can_be_returned_under(&self.return_policy, self.clock.now()))
    }

    async fn update_order<F>(&self, id: OrderId, operation: &'static str, change: F) -> Result<Order>
    where
        F: FnOnce(&Order, DateTime<Utc>) -> std::result::Result<Order, OrderError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let order = self.get_order(id).await?;
        let before = (order.status(), order.payment_status());
        let updated = change(&order, self.clock.now()).map_err(|err| {
            warn!(order_id = %id, operation, error = %err, "order operation rejected");
            EcommerceError::from(err)
        })?;
        let mut saved = self.orders.save_order(&updated).await?;
        info!(
            order_id = %id,
            operation,
            status_from = %before.0,
            status_to = %saved.status(),
            payment_from = %before.1,
            payment_to = %saved.payment_status(),
            "order updated"
        );
        self.publish(saved.take_events()).await;
        Ok(saved)
    }

    // ========================================================================
    // Promotions
    // ========================================================================

    pub async fn create_coupon(&self, draft: NewCoupon) -> Result<Coupon> {
        draft.validate()?;
        let coupon = draft.into_coupon(self.clock.now())?;
        let _guard = self.write_lock.lock().await;
        if self.promotions.find_coupon(coupon.code()).await?.is_some() {
            return Err(EcommerceError::DuplicateCoupon(coupon.code().clone()));
        }
        let saved = self.promotions.save_coupon(&coupon).await?;
        info!(code = %saved.code(), coupon_type = %saved.coupon_type(), "coupon created");
        Ok(saved)
    }

    pub async fn create_offer(&self, draft: NewOffer) -> Result<Offer> {
        draft.validate()?;
        let offer = self.promotions.save_offer(&draft.into_offer(self.clock.now())?).await?;
        info!(offer_id = ?offer.id(), offer_type = %offer.offer_type(), "offer created");
        Ok(offer)
    }

    pub async fn set_coupon_active(&self, code: &CouponCode, active: bool) -> Result<Coupon> {
        let _guard = self.write_lock.lock().await;
        let coupon = self.find_coupon(code).await?;
        let now = self.clock.now();
        let toggled = if active { coupon.activate(now) } else { coupon.deactivate(now) };
        self.promotions.save_coupon(&toggled).await
    }

    /// Prices a coupon without redeeming it.
    pub async fn quote_coupon(&self, code: &CouponCode, ctx: &OrderContext) -> Result<CouponEvaluation> {
        let coupon = self.find_coupon(code).await?;
        let evaluation = evaluate_coupon(&coupon, ctx, self.clock.now());
        if let CouponEvaluation::Rejected { ineligibility, .. } = &evaluation {
            debug!(code = %code, reason = %ineligibility, "coupon not applicable");
        }
        Ok(evaluation)
    }

    pub async fn best_offer_for(&self, ctx: &OrderContext) -> Result<Option<OfferQuote>> {
        let offers = self.promotions.list_offers().await?;
        Ok(best_offer(&offers, ctx, self.clock.now()))
    }

    /// Validates, redeems and applies a coupon to an order under the write lock.
    pub async fn redeem_coupon(&self, order_id: OrderId, code: &CouponCode, ctx: &OrderContext) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let order = self.get_order(order_id).await?;
        let coupon = self.find_coupon(code).await?;

        let quote = match evaluate_coupon(&coupon, ctx, now) {
            CouponEvaluation::Applied(quote) => quote,
            CouponEvaluation::Rejected { ineligibility, .. } => {
                debug!(order_id = %order_id, code = %code, reason = %ineligibility, "coupon rejected");
                return Err(EcommerceError::PromotionRejected(ineligibility));
            }
        };

        let mut priced = order.apply_discount(&quote.discount, now)?;
        if quote.waives_shipping {
            priced = priced.waive_shipping(now);
        }
        let priced = priced.recalculate_total(now)?;

        let mut saved = self.orders.save_order(&priced).await?;
        let redeemed = match self.promotions.save_coupon(&coupon.increment_usage(now)).await {
            Ok(redeemed) => redeemed,
            Err(err) => return Err(self.roll_back_order(&order, err).await),
        };
        info!(order_id = %order_id, code = %code, discount = %quote.discount, used_count = redeemed.used_count(), "coupon redeemed");

        let mut events = saved.take_events();
        events.push(DomainEvent::Promotion(PromotionEvent::CouponRedeemed { code: redeemed.code().clone(), used_count: redeemed.used_count() }));
        self.publish(events).await;
        Ok(saved)
    }

    /// Validates, redeems and applies an offer to an order under the write lock.
    pub async fn redeem_offer(&self, order_id: OrderId, offer_id: OfferId, ctx: &OrderContext) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let order = self.get_order(order_id).await?;
        let offer = self.promotions.find_offer(offer_id).await?.ok_or(EcommerceError::OfferNotFound(offer_id))?;

        let quote = match evaluate_offer(&offer, ctx, now) {
            OfferEvaluation::Applied(quote) => quote,
            OfferEvaluation::Rejected(ineligibility) => {
                debug!(order_id = %order_id, offer_id = %offer_id, reason = %ineligibility, "offer rejected");
                return Err(EcommerceError::PromotionRejected(ineligibility));
            }
        };

        let priced = order.apply_discount(&quote.discount, now)?.recalculate_total(now)?;
        let mut saved = self.orders.save_order(&priced).await?;
        let redeemed = match self.promotions.save_offer(&offer.increment_usage(now)).await {
            Ok(redeemed) => redeemed,
            Err(err) => return Err(self.roll_back_order(&order, err).await),
        };
        info!(order_id = %order_id, offer_id = %offer_id, discount = %quote.discount, "offer redeemed");

        let mut events = saved.take_events();
        events.push(DomainEvent::Promotion(PromotionEvent::OfferRedeemed { offer_id, used_count: redeemed.used_count() }));
        self.publish(events).await;
        Ok(saved)
    }

    /// Puts back the order as it was before a redemption whose usage increment failed to persist.
    async fn roll_back_order(&self, original: &Order, cause: EcommerceError) -> EcommerceError {
        warn!(order_id = ?original.id(), error = %cause, "usage increment not saved, restoring order");
        if let Err(err) = self.orders.save_order(original).await {
            warn!(order_id = ?original.id(), error = %err, "order restore failed");
        }
        cause
    }

    async fn find_coupon(&self, code: &CouponCode) -> Result<Coupon> {
        self.promotions.find_coupon(code).await?.ok_or_else(|| EcommerceError::CouponNotFound(code.clone()))
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub async fn drain_events(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.outbox.lock().await)
    }

    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        debug!(count = events.len(), "domain events recorded");
        self.outbox.lock().await.extend(events);
    }
}
