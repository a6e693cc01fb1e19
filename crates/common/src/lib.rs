//! Shared types used across the inventory service crates.

pub mod types;

pub use types::{Money, OrderId, ProductId, UserId};
