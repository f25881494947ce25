//! In-memory store that keeps entities as their flat records, the same shape
//! a database row would have.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use std::fmt::Display;
use tracing::{debug, warn};

use super::{OrderRepository, PromotionRepository};
use crate::domain::aggregates::Order;
use crate::domain::projection::{CouponRecord, OfferRecord, OrderRecord};
use crate::domain::promotion::{Coupon, Offer};
use crate::domain::value_objects::{CouponCode, InvalidValue, OfferId, OrderId};
use crate::{EcommerceError, Result};

#[derive(Default)]
struct Tables {
    orders: BTreeMap<u64, OrderRecord>,
    coupons: HashMap<String, CouponRecord>,
    offers: BTreeMap<u64, OfferRecord>,
    next_order_id: u64,
    next_coupon_id: u64,
    next_offer_id: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Raw record as it would be handed to the admin UI.
    pub async fn order_record(&self, id: OrderId) -> Option<OrderRecord> {
        self.tables.read().await.orders.get(&id.0).cloned()
    }

    pub async fn coupon_record(&self, code: &CouponCode) -> Option<CouponRecord> {
        self.tables.read().await.coupons.get(code.as_str()).cloned()
    }

    /// Stores a coupon row as-is, the way a bulk load from another system would.
    /// Only the code is checked here; the remaining columns are decoded on read.
    pub async fn import_coupon_record(&self, mut record: CouponRecord) -> Result<CouponCode> {
        let code = CouponCode::new(record.code.as_str())?;
        let mut tables = self.tables.write().await;
        let existing = tables.coupons.get(code.as_str()).and_then(|r| r.id);
        let id = match (record.id, existing) {
            (Some(id), _) => {
                tables.next_coupon_id = tables.next_coupon_id.max(id);
                id
            }
            (None, Some(id)) => id,
            (None, None) => {
                tables.next_coupon_id += 1;
                tables.next_coupon_id
            }
        };
        record.id = Some(id);
        record.code = code.to_string();
        tables.coupons.insert(code.to_string(), record);
        Ok(code)
    }

    /// Stores an offer row as-is. Columns are decoded on read.
    pub async fn import_offer_record(&self, mut record: OfferRecord) -> OfferId {
        let mut tables = self.tables.write().await;
        let id = match record.id {
            Some(id) => {
                tables.next_offer_id = tables.next_offer_id.max(id);
                id
            }
            None => {
                tables.next_offer_id += 1;
                tables.next_offer_id
            }
        };
        record.id = Some(id);
        tables.offers.insert(id, record);
        OfferId(id)
    }
}

/// A stored row that no longer decodes is a storage fault, not a bad request.
fn corrupt_record(kind: &str, key: impl Display, err: impl Display) -> EcommerceError {
    warn!(kind, key = %key, error = %err, "stored record does not decode");
    EcommerceError::StorageError(format!("{kind} {key}: {err}"))
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        let record = self.tables.read().await.orders.get(&id.0).cloned();
        record.map(Order::try_from).transpose().map_err(|err| corrupt_record("order", id, err))
    }

    async fn save_order(&self, order: &Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let stored = match order.id() {
            Some(id) => {
                if !tables.orders.contains_key(&id.0) {
                    return Err(EcommerceError::OrderNotFound(id));
                }
                order.clone()
            }
            None => {
                tables.next_order_id += 1;
                order.clone().with_id(OrderId(tables.next_order_id))
            }
        };
        let record = OrderRecord::from(&stored);
        if let Some(id) = stored.id() {
            debug!(order_id = %id, status = %record.status, "order saved");
            tables.orders.insert(id.0, record);
        }
        Ok(stored)
    }
}

#[async_trait]
impl PromotionRepository for InMemoryStore {
    async fn find_coupon(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        let record = self.tables.read().await.coupons.get(code.as_str()).cloned();
        record.map(Coupon::try_from).transpose().map_err(|err| corrupt_record("coupon", code, err))
    }

    async fn save_coupon(&self, coupon: &Coupon) -> Result<Coupon> {
        let mut tables = self.tables.write().await;
        let existing_id = tables.coupons.get(coupon.code().as_str()).and_then(|r| r.id);
        let stored = match (coupon.id(), existing_id) {
            (Some(_), _) => coupon.clone(),
            (None, Some(id)) => coupon.clone().with_id(id),
            (None, None) => {
                tables.next_coupon_id += 1;
                coupon.clone().with_id(tables.next_coupon_id)
            }
        };
        debug!(code = %stored.code(), "coupon saved");
        tables.coupons.insert(stored.code().to_string(), CouponRecord::from(&stored));
        Ok(stored)
    }

    async fn find_offer(&self, id: OfferId) -> Result<Option<Offer>> {
        let record = self.tables.read().await.offers.get(&id.0).cloned();
        record.map(Offer::try_from).transpose().map_err(|err| corrupt_record("offer", id, err))
    }

    async fn list_offers(&self) -> Result<Vec<Offer>> {
        let records: Vec<OfferRecord> = self.tables.read().await.offers.values().cloned().collect();
        records
            .into_iter()
            .map(|record| {
                let id = record.id.unwrap_or_default();
                Offer::try_from(record).map_err(|err: InvalidValue| corrupt_record("offer", id, err))
            })
            .collect()
    }

    async fn save_offer(&self, offer: &Offer) -> Result<Offer> {
        let mut tables = self.tables.write().await;
        let stored = match offer.id() {
            Some(_) => offer.clone(),
            None => {
                tables.next_offer_id += 1;
                offer.clone().with_id(OfferId(tables.next_offer_id))
            }
        };
        if let Some(id) = stored.id() {
            debug!(offer_id = %id, "offer saved");
            tables.offers.insert(id.0, OfferRecord::from(&stored));
        }
        Ok(stored)
    }
}
