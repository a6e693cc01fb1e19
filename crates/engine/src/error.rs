//! Order placement error taxonomy.

use common::{ProductId, UserId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order.
///
/// Every variant raised from inside the atomic unit implies the whole
/// unit was rolled back: no stock decrement or order row survives.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed request; nothing was touched.
    #[error("invalid order request: {0}")]
    InvalidRequest(String),

    /// The ordering user does not exist; nothing was touched.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// A line referenced a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A line asked for more than the available stock.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// The storage layer failed; the unit was discarded.
    #[error("storage error: {0}")]
    Persistence(#[from] StoreError),
}
