use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use std::sync::Arc;

use storefront_core::domain::aggregates::{LineItem, OrderAmounts};
use storefront_core::domain::projection::CouponRecord;
use storefront_core::domain::promotion::{evaluate_coupon, CouponRule, CouponScope, OfferType, ValidityWindow};
use storefront_core::domain::time::FixedClock;
use storefront_core::domain::value_objects::{CategoryId, CouponCode, OrderNumber, Percent, ProductId};
use storefront_core::repository::{InMemoryStore, PromotionRepository};
use storefront_core::service::CheckoutService;
use storefront_core::{Coupon, EcommerceError, Ineligibility, Money, Offer, Order, OrderContext, Promotion, PromotionStatus};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 28, 12, 0, 0).unwrap()
}

fn usd(amount: Decimal) -> Money {
    Money::usd(amount).unwrap()
}

fn code(raw: &str) -> CouponCode {
    CouponCode::new(raw).unwrap()
}

fn products(ids: &[u64]) -> BTreeSet<ProductId> {
    ids.iter().copied().map(ProductId).collect()
}

#[test]
fn percentage_discount_is_capped() {
    let coupon = Coupon::new(code("TEN"), CouponRule::Percentage(Percent::new(dec!(10)).unwrap()), now()).with_max_discount_amount(dec!(25));
    assert_eq!(coupon.calculate_discount(&usd(dec!(300))).amount(), dec!(25));
    assert_eq!(coupon.calculate_discount(&usd(dec!(200))).amount(), dec!(20));
}

#[test]
fn fixed_discount_never_exceeds_order() {
    let coupon = Coupon::new(code("FIFTEEN"), CouponRule::Fixed(dec!(15)), now());
    let discount = coupon.calculate_discount(&usd(dec!(10)));
    assert!(discount.amount() <= dec!(10));
    assert!(usd(dec!(10)).saturating_sub(&discount).unwrap().amount() >= Decimal::ZERO);
}

#[test]
fn exclusion_wins_over_inclusion() {
    let scope = CouponScope {
        applicable_products: products(&[1, 2]),
        excluded_products: products(&[1]),
        ..CouponScope::default()
    };
    let coupon = Coupon::new(code("SCOPED"), CouponRule::Fixed(dec!(5)), now()).with_scope(scope);
    let none = BTreeSet::new();

    assert!(!coupon.is_applicable_to_order(&usd(dec!(50)), &products(&[1]), &none));
    assert!(!coupon.is_applicable_to_order(&usd(dec!(50)), &products(&[1, 2]), &none));
    assert!(coupon.is_applicable_to_order(&usd(dec!(50)), &products(&[2]), &none));
    assert!(!coupon.is_applicable_to_order(&usd(dec!(50)), &products(&[3]), &none));
}

#[test]
fn excluded_category_is_reported() {
    let scope = CouponScope { excluded_categories: [CategoryId(9)].into(), ..CouponScope::default() };
    let coupon = Coupon::new(code("NOSALE"), CouponRule::Fixed(dec!(5)), now()).with_scope(scope);
    let ctx = OrderContext::new(usd(dec!(50))).with_categories([CategoryId(9), CategoryId(2)]);
    let evaluation = evaluate_coupon(&coupon, &ctx, now());
    assert_eq!(evaluation.quote(), None);
    assert!(matches!(
        evaluation,
        storefront_core::domain::promotion::CouponEvaluation::Rejected { ineligibility: Ineligibility::ExcludedCategory { category_id: CategoryId(9) }, .. }
    ));
}

#[test]
fn end_date_decides_usability_once_active() {
    let yesterday = ValidityWindow::new(None, Some(now() - Duration::days(1))).unwrap();
    let tomorrow = ValidityWindow::new(None, Some(now() + Duration::days(1))).unwrap();

    let expired = Coupon::new(code("OLD"), CouponRule::Fixed(dec!(1)), now()).with_window(yesterday).inactive().activate(now());
    let current = Coupon::new(code("NEW"), CouponRule::Fixed(dec!(1)), now()).with_window(tomorrow).inactive().activate(now());

    assert!(!expired.can_be_used(now()));
    assert_eq!(expired.effective_status(now()), PromotionStatus::Expired);
    assert!(current.can_be_used(now()));
    assert!(!current.deactivate(now()).can_be_used(now()));
}

#[test]
fn usage_cap_closes_after_n_redemptions() {
    let cap = 3;
    let mut coupon = Coupon::new(code("THREE"), CouponRule::Fixed(dec!(1)), now()).with_max_uses(cap);
    for _ in 0..cap {
        assert!(coupon.can_be_used(now()));
        coupon = coupon.increment_usage(now());
    }
    assert!(!coupon.can_be_used(now()));
    assert_eq!(coupon.remaining_uses(), Some(0));
    assert_eq!(coupon.effective_status(now()), PromotionStatus::Exhausted);
}

#[test]
fn unlimited_offer_ignores_cap() {
    let offer = Offer::new("Clearance", OfferType::Clearance, Percent::new(dec!(30)).unwrap(), now())
        .limited(false, Some(1))
        .with_used_count(10);
    assert!(offer.can_be_used(now()));
    assert!(!offer.limited(true, Some(1)).with_used_count(10).can_be_used(now()));
}

#[test]
fn coupon_record_keeps_admin_shape() {
    let scope = CouponScope { applicable_products: products(&[4, 2]), ..CouponScope::default() };
    let window = ValidityWindow::new(Some(now()), None).unwrap();
    let coupon = Coupon::new(code("shape"), CouponRule::Percentage(Percent::new(dec!(12.5)).unwrap()), now())
        .with_scope(scope)
        .with_window(window)
        .with_id(3);

    let json = serde_json::to_value(CouponRecord::from(&coupon)).unwrap();
    assert_eq!(json["code"], "SHAPE");
    assert_eq!(json["type"], "percentage");
    assert_eq!(json["applicable_products"], "[2,4]");
    assert_eq!(json["start_date"], "2025-11-28 12:00:00");
    assert_eq!(json["end_date"], serde_json::Value::Null);

    let back = Coupon::try_from(serde_json::from_value::<CouponRecord>(json).unwrap()).unwrap();
    assert_eq!(back, coupon);
}

#[tokio::test]
async fn concurrent_redemptions_respect_the_cap() {
    let store = InMemoryStore::new();
    let service = Arc::new(CheckoutService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(FixedClock::new(now())),
    ));
    let coupon_code = code("DOORBUSTER");
    store
        .save_coupon(&Coupon::new(coupon_code.clone(), CouponRule::Fixed(dec!(20)), now()).with_max_uses(5))
        .await
        .unwrap();

    let mut order_ids = Vec::new();
    for n in 0..20 {
        let item = LineItem::new(ProductId(1), "Speaker", "SPK-1", usd(dec!(80)), 1).unwrap();
        let amounts = OrderAmounts::from_parts(usd(dec!(80)), Money::zero("USD"), usd(dec!(6)), Money::zero("USD")).unwrap();
        let order = Order::place(OrderNumber::new(format!("ORD-BF-{n}")).unwrap(), vec![item], amounts, now()).unwrap();
        order_ids.push(service.place_order(order).await.unwrap().id().unwrap());
    }

    let handles: Vec<_> = order_ids
        .into_iter()
        .map(|order_id| {
            let service = Arc::clone(&service);
            let coupon_code = coupon_code.clone();
            tokio::spawn(async move {
                let ctx = OrderContext::new(usd(dec!(80))).with_products([ProductId(1)]);
                service.redeem_coupon(order_id, &coupon_code, &ctx).await
            })
        })
        .collect();

    let mut redeemed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => {
                redeemed += 1;
                assert_eq!(order.amounts().total_amount.amount(), dec!(66));
            }
            Err(EcommerceError::PromotionRejected(Ineligibility::UsageLimitReached)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(redeemed, 5);
    assert_eq!(store.coupon_record(&coupon_code).await.unwrap().used_count, 5);
    let stored = store.find_coupon(&coupon_code).await.unwrap().unwrap();
    assert!(!stored.can_be_used(now()));
}
