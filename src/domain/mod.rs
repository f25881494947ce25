//! Domain model: order lifecycle and promotional pricing.
pub mod aggregates;
pub mod events;
pub mod projection;
pub mod promotion;
pub mod time;
pub mod value_objects;
