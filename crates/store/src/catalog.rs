//! Catalog repository trait: products and their stock records.

use async_trait::async_trait;
use common::ProductId;

use crate::entities::{NewProduct, ProductUpdate, ProductWithStock};
use crate::error::Result;
use crate::page::{Page, PageRequest};

/// Read/write access to products and the stock quantity each one owns.
///
/// Stock decrements on behalf of an order go through
/// [`OrderUnit::decrement_stock`](crate::unit::OrderUnit::decrement_stock),
/// never through this trait.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Creates a product together with its stock record (atomically).
    /// Fails with [`StoreError::DuplicateSku`] if the SKU is taken.
    ///
    /// [`StoreError::DuplicateSku`]: crate::StoreError::DuplicateSku
    async fn create_product(&self, new: NewProduct) -> Result<ProductWithStock>;

    /// Looks up a product and its stock record by id.
    async fn get_product_with_stock(&self, id: ProductId) -> Result<Option<ProductWithStock>>;

    /// Lists products (stock embedded) ordered by creation time.
    async fn list_products(&self, page: PageRequest) -> Result<Page<ProductWithStock>>;

    /// Applies a partial update. Setting `stock` is the administrative
    /// stock-adjustment path and creates the stock record if absent.
    /// Returns `None` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<ProductWithStock>>;

    /// Deletes a product, cascading to its stock record. Order lines
    /// referencing the product are untouched (soft reference). Returns
    /// `false` when the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    /// Total number of products.
    async fn count_products(&self) -> Result<u64>;
}
