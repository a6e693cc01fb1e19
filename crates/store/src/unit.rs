//! The atomic unit of work used by the order transaction engine.
//!
//! A unit spans the whole reservation sequence: locked product/stock
//! reads, stock decrements and the order insert commit together or not
//! at all. Dropping a unit without calling [`OrderUnit::commit`] rolls
//! back every write made through it.

use async_trait::async_trait;
use common::ProductId;

use crate::entities::{Order, OrderLine, ProductWithStock};
use crate::error::Result;

/// Writes staged inside one atomic unit.
#[async_trait]
pub trait OrderUnit: Send {
    /// Reads a product and its stock record, holding whatever lock the
    /// backend needs to serialize concurrent reservations of the same
    /// product. Reads observe decrements staged earlier in this unit.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductWithStock>>;

    /// Decrements the product's stock by `amount` (provisional until
    /// commit). Fails with [`StoreError::Constraint`] if the decrement
    /// would drive the quantity negative.
    ///
    /// [`StoreError::Constraint`]: crate::StoreError::Constraint
    async fn decrement_stock(&mut self, id: ProductId, amount: i32) -> Result<()>;

    /// Stages the order and its lines for insertion.
    async fn insert_order(&mut self, order: &Order, lines: &[OrderLine]) -> Result<()>;

    /// Commits every write staged in this unit.
    async fn commit(self) -> Result<()>;
}

/// Factory for atomic units.
#[async_trait]
pub trait UnitStore: Send + Sync {
    type Unit: OrderUnit;

    /// Opens a new atomic unit.
    async fn begin(&self) -> Result<Self::Unit>;
}
