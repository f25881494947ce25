//! Storefront Core
//!
//! Order lifecycle and promotional pricing for the storefront.
//!
//! ## Features
//! - Order status state machine with lifecycle timestamps
//! - Return window policy
//! - Coupon and offer eligibility checks
//! - Discount calculation with caps and clamping
//! - Flat wire records for the admin UI
//!
//! Domain operations are pure: they take the current time explicitly and
//! return new records. Persistence and the check-then-redeem transaction
//! belong to the repository and service layers.

pub mod config;
pub mod domain;
pub mod repository;
pub mod service;

pub use domain::aggregates::{Order, OrderError, OrderStatus, PaymentStatus, ReturnPolicy};
pub use domain::promotion::{Coupon, Ineligibility, Offer, OrderContext, Promotion, PromotionStatus};
pub use domain::value_objects::{CouponCode, InvalidValue, Money, OfferId, OrderId};

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Coupon not found: {0}")]
    CouponNotFound(CouponCode),

    #[error("Offer not found: {0}")]
    OfferNotFound(OfferId),

    #[error("Coupon already exists: {0}")]
    DuplicateCoupon(CouponCode),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),

    #[error("Promotion not applicable: {0}")]
    PromotionRejected(Ineligibility),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl EcommerceError {
    /// True for failures caused by the request (bad transition, unknown value,
    /// ineligible promotion) rather than by the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::StorageError(_))
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
