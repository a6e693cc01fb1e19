//! In-memory store implementation for testing.
//!
//! Provides the same interface as the PostgreSQL implementation. The
//! atomic unit holds the store-wide mutex for its whole lifetime, which
//! serializes concurrent reservations the way row locks do in Postgres
//! (coarser, but the observable outcome is the same).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::catalog::CatalogStore;
use crate::entities::{
    NewProduct, NewUser, Order, OrderLine, OrderStatus, OrderWithLines, Product, ProductUpdate,
    ProductWithStock, StockRecord, User, UserUpdate,
};
use crate::error::{Result, StoreError};
use crate::orders::OrderStore;
use crate::page::{Page, PageRequest};
use crate::unit::{OrderUnit, UnitStore};
use crate::users::UserStore;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    stock: HashMap<ProductId, StockRecord>,
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
}

/// In-memory relational store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(mut items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let start = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = if start >= items.len() {
        Vec::new()
    } else {
        items
            .drain(start..)
            .take(page.per_page as usize)
            .collect()
    };
    Page {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut state = self.state.lock().await;
        for user in state.users.values() {
            if user.username == new.username {
                return Err(StoreError::DuplicateIdentity(new.username));
            }
            if user.email == new.email {
                return Err(StoreError::DuplicateIdentity(new.email));
            }
        }
        let user = User {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id.as_uuid()));
        Ok(paginate(users, page))
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<Option<User>> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        for user in state.users.values() {
            if user.id == id {
                continue;
            }
            if let Some(ref username) = update.username
                && &user.username == username
            {
                return Err(StoreError::DuplicateIdentity(username.clone()));
            }
            if let Some(ref email) = update.email
                && &user.email == email
            {
                return Err(StoreError::DuplicateIdentity(email.clone()));
            }
        }
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::Constraint("user vanished during update".to_string()))?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.orders.values().any(|o| o.user_id == id) {
            return Err(StoreError::Constraint(format!(
                "user {id} still has orders"
            )));
        }
        Ok(state.users.remove(&id).is_some())
    }

    async fn count_users(&self) -> Result<u64> {
        Ok(self.state.lock().await.users.len() as u64)
    }
}

fn product_with_stock(state: &MemoryState, id: ProductId) -> Option<ProductWithStock> {
    let product = state.products.get(&id)?.clone();
    let stock = state.stock.get(&id).cloned();
    Some(ProductWithStock { product, stock })
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_product(&self, new: NewProduct) -> Result<ProductWithStock> {
        let mut state = self.state.lock().await;
        if state.products.values().any(|p| p.sku == new.sku) {
            return Err(StoreError::DuplicateSku(new.sku));
        }
        if new.initial_stock < 0 {
            return Err(StoreError::Constraint(
                "stock must be non-negative".to_string(),
            ));
        }
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            price: new.price,
            sku: new.sku,
            created_at: now,
        };
        let stock = StockRecord {
            product_id: product.id,
            quantity: new.initial_stock,
            last_updated: now,
        };
        state.products.insert(product.id, product.clone());
        state.stock.insert(product.id, stock.clone());
        Ok(ProductWithStock {
            product,
            stock: Some(stock),
        })
    }

    async fn get_product_with_stock(&self, id: ProductId) -> Result<Option<ProductWithStock>> {
        Ok(product_with_stock(&*self.state.lock().await, id))
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<ProductWithStock>> {
        let state = self.state.lock().await;
        let mut products: Vec<&Product> = state.products.values().collect();
        products.sort_by_key(|p| (p.created_at, p.id.as_uuid()));
        let items = products
            .into_iter()
            .map(|p| ProductWithStock {
                product: p.clone(),
                stock: state.stock.get(&p.id).cloned(),
            })
            .collect();
        Ok(paginate(items, page))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<ProductWithStock>> {
        let mut state = self.state.lock().await;
        if !state.products.contains_key(&id) {
            return Ok(None);
        }
        if let Some(ref sku) = update.sku
            && state.products.values().any(|p| p.id != id && &p.sku == sku)
        {
            return Err(StoreError::DuplicateSku(sku.clone()));
        }
        if let Some(quantity) = update.stock
            && quantity < 0
        {
            return Err(StoreError::Constraint(
                "stock must be non-negative".to_string(),
            ));
        }
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::Constraint("product vanished during update".to_string()))?;
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(sku) = update.sku {
            product.sku = sku;
        }
        if let Some(quantity) = update.stock {
            let record = StockRecord {
                product_id: id,
                quantity,
                last_updated: Utc::now(),
            };
            state.stock.insert(id, record);
        }
        Ok(product_with_stock(&state, id))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.stock.remove(&id);
        Ok(state.products.remove(&id).is_some())
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.state.lock().await.products.len() as u64)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithLines>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|order| OrderWithLines {
            order: order.clone(),
            lines: state.lines.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<OrderWithLines>> {
        let state = self.state.lock().await;
        let mut orders: Vec<&Order> = state.orders.values().collect();
        orders.sort_by_key(|o| (o.order_date, o.id.as_uuid()));
        let items = orders
            .into_iter()
            .map(|o| OrderWithLines {
                order: o.clone(),
                lines: state.lines.get(&o.id).cloned().unwrap_or_default(),
            })
            .collect();
        Ok(paginate(items, page))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderWithLines>> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };
        order.status = status;
        let order = order.clone();
        let lines = state.lines.get(&id).cloned().unwrap_or_default();
        Ok(Some(OrderWithLines { order, lines }))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.lines.remove(&id);
        Ok(state.orders.remove(&id).is_some())
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.state.lock().await.orders.len() as u64)
    }
}

/// Atomic unit over the in-memory store.
///
/// Holds the store-wide mutex for its lifetime and stages all writes;
/// dropping without commit discards them.
pub struct MemoryOrderUnit {
    state: OwnedMutexGuard<MemoryState>,
    staged_decrements: HashMap<ProductId, i32>,
    staged_order: Option<(Order, Vec<OrderLine>)>,
}

#[async_trait]
impl OrderUnit for MemoryOrderUnit {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductWithStock>> {
        let staged = self.staged_decrements.get(&id).copied().unwrap_or(0);
        Ok(product_with_stock(&self.state, id).map(|mut pws| {
            if let Some(ref mut stock) = pws.stock {
                stock.quantity -= staged;
            }
            pws
        }))
    }

    async fn decrement_stock(&mut self, id: ProductId, amount: i32) -> Result<()> {
        let staged = self.staged_decrements.get(&id).copied().unwrap_or(0);
        let available = self.state.stock.get(&id).map_or(0, |s| s.quantity) - staged;
        if amount > available {
            return Err(StoreError::Constraint(format!(
                "stock underflow for product {id}"
            )));
        }
        *self.staged_decrements.entry(id).or_insert(0) += amount;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        self.staged_order = Some((order.clone(), lines.to_vec()));
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        let now = Utc::now();
        for (id, amount) in self.staged_decrements.drain() {
            if let Some(stock) = self.state.stock.get_mut(&id) {
                stock.quantity -= amount;
                stock.last_updated = now;
            }
        }
        if let Some((order, lines)) = self.staged_order.take() {
            self.state.lines.insert(order.id, lines);
            self.state.orders.insert(order.id, order);
        }
        Ok(())
    }
}

#[async_trait]
impl UnitStore for InMemoryStore {
    type Unit = MemoryOrderUnit;

    /// Opens a unit. Other store operations block until the unit is
    /// committed or dropped; do not hold a unit across unrelated calls
    /// on the same store.
    async fn begin(&self) -> Result<Self::Unit> {
        Ok(MemoryOrderUnit {
            state: self.state.clone().lock_owned().await,
            staged_decrements: HashMap::new(),
            staged_order: None,
        })
    }
}
