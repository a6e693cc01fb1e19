//! Order repository trait.
//!
//! Order creation is not here: new orders are only persisted inside the
//! transaction engine's atomic unit via
//! [`OrderUnit::insert_order`](crate::unit::OrderUnit::insert_order).

use async_trait::async_trait;
use common::OrderId;

use crate::entities::{OrderStatus, OrderWithLines};
use crate::error::Result;
use crate::page::{Page, PageRequest};

/// Read and administrative access to committed orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Looks up an order with its lines in submission order.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithLines>>;

    /// Lists orders (lines embedded) ordered by order date.
    async fn list_orders(&self, page: PageRequest) -> Result<Page<OrderWithLines>>;

    /// Sets the status of an order. Returns `None` when the order does
    /// not exist. Cancelling an order does not restore stock (confirmed
    /// policy).
    async fn update_status(&self, id: OrderId, status: OrderStatus)
    -> Result<Option<OrderWithLines>>;

    /// Deletes an order, cascading to its lines. Stock is never
    /// restored. Returns `false` when the order does not exist.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;

    /// Total number of orders.
    async fn count_orders(&self) -> Result<u64>;
}
