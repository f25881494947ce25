//! Aggregates module
pub mod order;

pub use order::{Address, LineItem, Order, OrderAmounts, OrderError, OrderSnapshot, OrderStatus, PaymentStatus, ReturnPolicy};
