//! Order transaction engine.
//!
//! Validates a multi-item order against live stock, atomically
//! decrements inventory per line item, computes the order total and
//! commits an immutable order record. The activity log is notified
//! after commit, fire-and-forget.

pub mod engine;
pub mod error;

pub use engine::{LineRequest, OrderEngine};
pub use error::OrderError;
