//! Storefront Core - prices a checkout request against its promotions.
//!
//! Usage: `storefront-core <request.json>` (or `-` for stdin). Prints a JSON quote.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_core::config::Config;
use storefront_core::domain::projection::{CouponRecord, OfferRecord};
use storefront_core::domain::promotion::{CouponEvaluation, OfferQuote, OrderContext};
use storefront_core::domain::time::{timestamp, Clock, FixedClock, SystemClock};
use storefront_core::domain::value_objects::{CategoryId, ProductId};
use storefront_core::repository::InMemoryStore;
use storefront_core::service::CheckoutService;
use storefront_core::Money;

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    #[serde(default, with = "timestamp::option")]
    at: Option<DateTime<Utc>>,
    coupon: Option<CouponRecord>,
    #[serde(default)]
    offers: Vec<OfferRecord>,
    order: OrderRequest,
}

#[derive(Debug, Deserialize)]
struct OrderRequest {
    subtotal: Decimal,
    #[serde(default)]
    product_ids: BTreeSet<ProductId>,
    #[serde(default)]
    category_ids: BTreeSet<CategoryId>,
    #[serde(default)]
    is_first_order: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum DiscountSource { Coupon, Offer, None }

#[derive(Debug, Serialize)]
struct CheckoutQuote {
    coupon: Option<CouponEvaluation>,
    offer: Option<OfferQuote>,
    source: DiscountSource,
    discount: Money,
    waives_shipping: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args().nth(1).context("usage: storefront-core <request.json | ->")?;
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?
    };
    let request: CheckoutRequest = serde_json::from_str(&raw).context("parsing checkout request")?;

    let quote = price(request, &config).await?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}

async fn price(request: CheckoutRequest, config: &Config) -> Result<CheckoutQuote> {
    let clock: Arc<dyn Clock> = match request.at {
        Some(at) => Arc::new(FixedClock::new(at)),
        None => Arc::new(SystemClock),
    };
    let store = InMemoryStore::new();
    let service = CheckoutService::new(Arc::new(store.clone()), Arc::new(store.clone()), clock)
        .with_return_policy(config.return_policy);

    let coupon_code = match request.coupon {
        Some(record) => Some(store.import_coupon_record(record).await?),
        None => None,
    };
    let offer_count = request.offers.len();
    for record in request.offers {
        store.import_offer_record(record).await;
    }
    tracing::info!(coupon = ?coupon_code, offers = offer_count, "promotions loaded");

    let ctx = OrderContext::new(Money::new(request.order.subtotal, &config.currency)?)
        .with_products(request.order.product_ids)
        .with_categories(request.order.category_ids)
        .first_order(request.order.is_first_order);

    let coupon = match &coupon_code {
        Some(code) => Some(service.quote_coupon(code, &ctx).await?),
        None => None,
    };
    let offer = service.best_offer_for(&ctx).await?;

    // Promotions do not stack. The larger discount wins; ties and free shipping keep the coupon.
    let coupon_quote = coupon.as_ref().and_then(CouponEvaluation::quote);
    let (source, discount, waives_shipping) = match (coupon_quote, &offer) {
        (Some(c), Some(o)) if o.discount.amount() > c.discount.amount() && !c.waives_shipping => (DiscountSource::Offer, o.discount.clone(), false),
        (Some(c), _) => (DiscountSource::Coupon, c.discount.clone(), c.waives_shipping),
        (None, Some(o)) => (DiscountSource::Offer, o.discount.clone(), false),
        (None, None) => (DiscountSource::None, Money::zero(&config.currency), false),
    };

    Ok(CheckoutQuote { coupon, offer, source, discount, waives_shipping })
}
