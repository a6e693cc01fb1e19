//! PostgreSQL-backed store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

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

/// PostgreSQL-backed relational store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// Maps unique/foreign-key violations onto the store error taxonomy by
/// constraint name; everything else stays a database error.
fn map_constraint(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if let Some(constraint) = db_err.constraint() {
            tracing::debug!(constraint, "database constraint violated");
        }
        match db_err.constraint() {
            Some("users_username_key") => {
                return StoreError::DuplicateIdentity("username".to_string());
            }
            Some("users_email_key") => {
                return StoreError::DuplicateIdentity("email".to_string());
            }
            Some("products_sku_key") => return StoreError::DuplicateSku("sku".to_string()),
            Some("orders_user_id_fkey") => {
                return StoreError::Constraint("user still has orders".to_string());
            }
            Some("stock_quantity_check") => {
                return StoreError::Constraint("stock must be non-negative".to_string());
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get::<i64, _>("price_cents")?),
        sku: row.try_get("sku")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Maps a product row joined against stock; the stock columns are
/// nullable because the join is a LEFT JOIN.
fn row_to_product_with_stock(row: &PgRow) -> Result<ProductWithStock> {
    let product = row_to_product(row)?;
    let quantity: Option<i32> = row.try_get("quantity")?;
    let last_updated: Option<DateTime<Utc>> = row.try_get("last_updated")?;
    let stock = match (quantity, last_updated) {
        (Some(quantity), Some(last_updated)) => Some(StockRecord {
            product_id: product.id,
            quantity,
            last_updated,
        }),
        _ => None,
    };
    Ok(ProductWithStock { product, stock })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| StoreError::Constraint(format!("unknown order status: {status}")))?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        order_date: row.try_get("order_date")?,
        status,
        total_amount: Money::from_cents(row.try_get::<i64, _>("total_amount_cents")?),
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        price_at_purchase: Money::from_cents(row.try_get::<i64, _>("price_at_purchase_cents")?),
    })
}

const PRODUCT_WITH_STOCK_COLUMNS: &str = "p.id, p.name, p.description, p.price_cents, p.sku, \
     p.created_at, s.quantity, s.last_updated";

#[async_trait]
impl UserStore for PostgresStore {
    #[tracing::instrument(skip(self, new), fields(username = %new.username))]
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = User {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            created_at: Utc::now(),
        };
        sqlx::query("INSERT INTO users (id, username, email, created_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id.as_uuid())
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_constraint)?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, email, created_at FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, username, email, created_at FROM users \
             ORDER BY created_at, id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        sqlx::query("UPDATE users SET username = $2, email = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(&user.username)
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .map_err(map_constraint)?;
        Ok(Some(user))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_constraint)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[tracing::instrument(skip(self, new), fields(sku = %new.sku))]
    async fn create_product(&self, new: NewProduct) -> Result<ProductWithStock> {
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

        // Product and its stock record are created in one transaction.
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO products (id, name, description, price_cents, sku, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.sku)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_constraint)?;

        sqlx::query("INSERT INTO stock (product_id, quantity, last_updated) VALUES ($1, $2, $3)")
            .bind(stock.product_id.as_uuid())
            .bind(stock.quantity)
            .bind(stock.last_updated)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint)?;
        tx.commit().await?;

        Ok(ProductWithStock {
            product,
            stock: Some(stock),
        })
    }

    async fn get_product_with_stock(&self, id: ProductId) -> Result<Option<ProductWithStock>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_WITH_STOCK_COLUMNS} FROM products p \
             LEFT JOIN stock s ON s.product_id = p.id WHERE p.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_product_with_stock).transpose()
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<ProductWithStock>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_WITH_STOCK_COLUMNS} FROM products p \
             LEFT JOIN stock s ON s.product_id = p.id \
             ORDER BY p.created_at, p.id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(row_to_product_with_stock)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<ProductWithStock>> {
        let Some(current) = self.get_product_with_stock(id).await? else {
            return Ok(None);
        };
        let mut product = current.product;
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

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE products SET name = $2, description = $3, price_cents = $4, sku = $5 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.sku)
        .execute(&mut *tx)
        .await
        .map_err(map_constraint)?;

        if let Some(quantity) = update.stock {
            sqlx::query(
                "INSERT INTO stock (product_id, quantity, last_updated) VALUES ($1, $2, NOW()) \
                 ON CONFLICT (product_id) DO UPDATE \
                 SET quantity = EXCLUDED.quantity, last_updated = EXCLUDED.last_updated",
            )
            .bind(id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(map_constraint)?;
        }
        tx.commit().await?;

        self.get_product_with_stock(id).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        // Stock cascades via FK; order lines keep their soft reference.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

async fn lines_for_orders(pool: &PgPool, order_ids: &[Uuid]) -> Result<Vec<OrderLine>> {
    let rows = sqlx::query(
        "SELECT order_id, product_id, quantity, price_at_purchase_cents FROM order_lines \
         WHERE order_id = ANY($1) ORDER BY order_id, position",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_order_line).collect()
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithLines>> {
        let row = sqlx::query(
            "SELECT id, user_id, order_date, status, total_amount_cents FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;
        let lines = lines_for_orders(&self.pool, &[id.as_uuid()]).await?;
        Ok(Some(OrderWithLines { order, lines }))
    }

    async fn list_orders(&self, page: PageRequest) -> Result<Page<OrderWithLines>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, user_id, order_date, status, total_amount_cents FROM orders \
             ORDER BY order_date, id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let mut lines_by_order = std::collections::HashMap::<OrderId, Vec<OrderLine>>::new();
        for line in lines_for_orders(&self.pool, &ids).await? {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }

        let items = orders
            .into_iter()
            .map(|order| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                OrderWithLines { order, lines }
            })
            .collect();
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<OrderWithLines>> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_order(id).await
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        // Lines cascade via FK; stock is never restored.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// Atomic unit over a PostgreSQL transaction. Stock rows are locked
/// with `SELECT ... FOR UPDATE`, which serializes concurrent
/// reservations per product. Dropping the unit rolls the transaction
/// back.
pub struct PostgresOrderUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderUnit for PostgresOrderUnit {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductWithStock>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, sku, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let product = row_to_product(&row)?;

        // The row lock on stock is what prevents two concurrent orders
        // from both observing sufficient quantity.
        let stock_row = sqlx::query(
            "SELECT quantity, last_updated FROM stock WHERE product_id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        let stock = stock_row
            .map(|row| -> Result<StockRecord> {
                Ok(StockRecord {
                    product_id: id,
                    quantity: row.try_get("quantity")?,
                    last_updated: row.try_get("last_updated")?,
                })
            })
            .transpose()?;
        Ok(Some(ProductWithStock { product, stock }))
    }

    async fn decrement_stock(&mut self, id: ProductId, amount: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE stock SET quantity = quantity - $2, last_updated = NOW() \
             WHERE product_id = $1 AND quantity >= $2",
        )
        .bind(id.as_uuid())
        .bind(amount)
        .execute(&mut *self.tx)
        .await
        .map_err(map_constraint)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Constraint(format!(
                "stock underflow for product {id}"
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_date, status, total_amount_cents) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(order.total_amount.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(map_constraint)?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_lines \
                 (id, order_id, position, product_id, quantity, price_at_purchase_cents) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(line.order_id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.price_at_purchase.cents())
            .execute(&mut *self.tx)
            .await
            .map_err(map_constraint)?;
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UnitStore for PostgresStore {
    type Unit = PostgresOrderUnit;

    async fn begin(&self) -> Result<Self::Unit> {
        Ok(PostgresOrderUnit {
            tx: self.pool.begin().await?,
        })
    }
}
