//! Row-level entities persisted by the relational store.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A registered user. Orders hold a foreign reference to the user,
/// never a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

/// Partial update of a user; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// A catalog product. The SKU is unique and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub sku: String,
    pub created_at: DateTime<Utc>,
}

/// Quantity on hand for a product (1:1 with the product row).
///
/// Invariant: `quantity >= 0` at all times. Decremented only inside the
/// order transaction engine's atomic unit, or set directly through an
/// administrative product update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub quantity: i32,
    pub last_updated: DateTime<Utc>,
}

/// A product together with its optional stock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductWithStock {
    pub product: Product,
    pub stock: Option<StockRecord>,
}

impl ProductWithStock {
    /// Available quantity; a missing stock record counts as zero.
    pub fn quantity(&self) -> i32 {
        self.stock.as_ref().map_or(0, |s| s.quantity)
    }
}

/// Fields required to create a product. A stock record is always
/// created alongside, holding `initial_stock`.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub sku: String,
    pub initial_stock: i32,
}

/// Partial update of a product; `None` fields are left unchanged.
/// Setting `stock` is the administrative stock-adjustment path and
/// creates the stock record if it does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Parses a status from its canonical string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Canonical string form, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable order record. The total amount is derived from the
/// lines at placement time and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Money,
}

/// A single line of an order.
///
/// `product_id` is a soft reference: the product may be deleted later
/// without invalidating order history. `price_at_purchase` is
/// snapshotted from the product's price at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price_at_purchase: Money,
}

/// An order with its lines in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}
