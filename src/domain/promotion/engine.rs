//! Evaluates coupons and offers against an order being priced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Coupon, Ineligibility, Offer, Promotion};
use crate::domain::value_objects::{CategoryId, CouponCode, Money, OfferId, ProductId};

/// What checkout knows about the order at pricing time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderContext {
    pub subtotal: Money,
    #[serde(default)]
    pub product_ids: BTreeSet<ProductId>,
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
    /// Supplied by the caller; used by first-order-only coupons.
    #[serde(default)]
    pub is_first_order: bool,
}

impl OrderContext {
    pub fn new(subtotal: Money) -> Self {
        Self { subtotal, product_ids: BTreeSet::new(), category_ids: BTreeSet::new(), is_first_order: false }
    }
    pub fn with_products(mut self, ids: impl IntoIterator<Item = ProductId>) -> Self { self.product_ids.extend(ids); self }
    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self { self.category_ids.extend(ids); self }
    pub fn first_order(mut self, is_first_order: bool) -> Self { self.is_first_order = is_first_order; self }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponQuote {
    pub code: CouponCode,
    pub discount: Money,
    /// Set for free-shipping coupons; the caller zeroes the shipping cost.
    pub waives_shipping: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CouponEvaluation {
    Applied(CouponQuote),
    Rejected { code: CouponCode, ineligibility: Ineligibility },
}

impl CouponEvaluation {
    pub fn quote(&self) -> Option<&CouponQuote> {
        match self {
            Self::Applied(quote) => Some(quote),
            Self::Rejected { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferQuote {
    pub offer_id: Option<OfferId>,
    pub title: String,
    pub discount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OfferEvaluation {
    Applied(OfferQuote),
    Rejected(Ineligibility),
}

/// Usability, first-order rule, minimum amount and scope, then the discount.
pub fn evaluate_coupon(coupon: &Coupon, ctx: &OrderContext, now: DateTime<Utc>) -> CouponEvaluation {
    let rejection = coupon.unusable_reason(now)
        .or_else(|| (coupon.is_first_time_only() && !ctx.is_first_order).then_some(Ineligibility::FirstOrderOnly))
        .or_else(|| coupon.order_rejection(&ctx.subtotal, &ctx.product_ids, &ctx.category_ids));
    match rejection {
        Some(ineligibility) => CouponEvaluation::Rejected { code: coupon.code().clone(), ineligibility },
        None => CouponEvaluation::Applied(CouponQuote {
            code: coupon.code().clone(),
            discount: coupon.calculate_discount(&ctx.subtotal),
            waives_shipping: coupon.waives_shipping(),
        }),
    }
}

/// An offer applies to the order when its product (if any) and its category (if any) both appear.
pub fn evaluate_offer(offer: &Offer, ctx: &OrderContext, now: DateTime<Utc>) -> OfferEvaluation {
    if let Some(ineligibility) = offer.unusable_reason(now) {
        return OfferEvaluation::Rejected(ineligibility);
    }
    if let Some(minimum) = offer.min_order_amount() {
        if !offer.meets_minimum(&ctx.subtotal) {
            return OfferEvaluation::Rejected(Ineligibility::BelowMinimumOrder { minimum });
        }
    }
    if offer.product_id().is_some_and(|id| !ctx.product_ids.contains(&id)) {
        return OfferEvaluation::Rejected(Ineligibility::NoApplicableProduct);
    }
    if offer.category_id().is_some_and(|id| !ctx.category_ids.contains(&id)) {
        return OfferEvaluation::Rejected(Ineligibility::NoApplicableCategory);
    }
    OfferEvaluation::Applied(OfferQuote {
        offer_id: offer.id(),
        title: offer.title().to_string(),
        discount: offer.calculate_discount(&ctx.subtotal),
    })
}

/// The applicable offer with the largest discount. Ties keep the earlier offer.
pub fn best_offer(offers: &[Offer], ctx: &OrderContext, now: DateTime<Utc>) -> Option<OfferQuote> {
    offers
        .iter()
        .filter_map(|offer| match evaluate_offer(offer, ctx, now) {
            OfferEvaluation::Applied(quote) => Some(quote),
            OfferEvaluation::Rejected(_) => None,
        })
        .fold(None, |best: Option<OfferQuote>, quote| match best {
            Some(best) if best.discount.amount() >= quote.discount.amount() => Some(best),
            _ => Some(quote),
        })
}
