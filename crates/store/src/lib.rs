//! Relational store for the inventory service.
//!
//! Defines the entities, repository traits and the atomic-unit abstraction
//! used by the order transaction engine, along with two backends: an
//! in-memory store for testing and a PostgreSQL store for production.

pub mod catalog;
pub mod entities;
pub mod error;
pub mod memory;
pub mod orders;
pub mod page;
pub mod postgres;
pub mod unit;
pub mod users;

pub use catalog::CatalogStore;
pub use entities::{
    NewProduct, NewUser, Order, OrderLine, OrderStatus, OrderWithLines, Product, ProductUpdate,
    ProductWithStock, StockRecord, User, UserUpdate,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use orders::OrderStore;
pub use page::{Page, PageRequest};
pub use postgres::PostgresStore;
pub use unit::{OrderUnit, UnitStore};
pub use users::UserStore;

/// A complete relational store backend.
///
/// Blanket-implemented for anything that provides all repositories plus
/// the atomic-unit factory.
pub trait Store: UserStore + CatalogStore + OrderStore + UnitStore {}

impl<S> Store for S where S: UserStore + CatalogStore + OrderStore + UnitStore {}
