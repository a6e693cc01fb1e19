//! The order placement transaction.

use activity::{ActionKind, ActivityEvent, ActivityLog, Actor};
use chrono::Utc;
use common::{Money, OrderId, ProductId, UserId};
use store::{Order, OrderLine, OrderStatus, OrderUnit, OrderWithLines, UnitStore, UserStore};

use crate::error::OrderError;

/// One (product, quantity) pair submitted as part of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Places orders against the relational store and mirrors the result
/// into the activity log.
///
/// Steps 2–5 of [`place_order`](Self::place_order) run inside one
/// atomic unit: all stock decrements and the order insert commit
/// together or not at all.
#[derive(Clone)]
pub struct OrderEngine<S, L> {
    store: S,
    activity: L,
}

impl<S, L> OrderEngine<S, L>
where
    S: UserStore + UnitStore,
    L: ActivityLog,
{
    /// Creates an engine over the given store and activity sink.
    pub fn new(store: S, activity: L) -> Self {
        Self { store, activity }
    }

    /// Places an order for `user_id`.
    ///
    /// Line requests are processed in submission order; a request that
    /// names the same product twice is charged against the stock value
    /// already decremented by its earlier lines. On any failure the
    /// whole unit rolls back and no partial state survives. The
    /// CREATE_ORDER activity event is emitted only after a successful
    /// commit and its delivery is best-effort.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        lines: Vec<LineRequest>,
    ) -> Result<OrderWithLines, OrderError> {
        let result = self.check_and_reserve(user_id, &lines).await;
        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order.id,
                    user = %user_id,
                    total = %placed.order.total_amount,
                    "order placed"
                );
                self.activity
                    .record(ActivityEvent::new(
                        Actor::User(user_id),
                        ActionKind::CreateOrder,
                        format!(
                            "Order {} created. Total: {}",
                            placed.order.id, placed.order.total_amount
                        ),
                    ))
                    .await;
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::info!(error = %e, "order rejected");
            }
        }
        result
    }

    /// Every failure, from malformed input to a storage error, funnels
    /// through here so the rejection counter sees all of them.
    async fn check_and_reserve(
        &self,
        user_id: UserId,
        lines: &[LineRequest],
    ) -> Result<OrderWithLines, OrderError> {
        self.validate(lines)?;
        self.store
            .get_user(user_id)
            .await?
            .ok_or(OrderError::UserNotFound(user_id))?;
        self.reserve_and_commit(user_id, lines).await
    }

    fn validate(&self, lines: &[LineRequest]) -> Result<(), OrderError> {
        if lines.is_empty() {
            return Err(OrderError::InvalidRequest(
                "order must contain at least one item".to_string(),
            ));
        }
        for line in lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidRequest(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
            if i32::try_from(line.quantity).is_err() {
                return Err(OrderError::InvalidRequest(format!(
                    "quantity for product {} is out of range",
                    line.product_id
                )));
            }
        }
        Ok(())
    }

    /// Runs the atomic unit. Returning early through `?` drops the
    /// unit, which rolls back every provisional write.
    async fn reserve_and_commit(
        &self,
        user_id: UserId,
        lines: &[LineRequest],
    ) -> Result<OrderWithLines, OrderError> {
        let mut unit = self.store.begin().await?;

        let order_id = OrderId::new();
        let mut total = Money::zero();
        let mut order_lines = Vec::with_capacity(lines.len());

        for line in lines {
            let quantity = line.quantity as i32;
            let pws = unit
                .product_for_update(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;

            let available = pws.quantity();
            if quantity > available {
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: quantity,
                    available,
                });
            }

            unit.decrement_stock(line.product_id, quantity).await?;

            // Price-at-purchase is the product's current price, read
            // under the same transaction that holds the stock lock.
            // Checked arithmetic keeps the total non-negative even for
            // absurdly priced products.
            total = pws
                .product
                .price
                .checked_mul(line.quantity)
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or_else(|| {
                    OrderError::InvalidRequest(format!(
                        "order total overflows at product {}",
                        line.product_id
                    ))
                })?;
            order_lines.push(OrderLine {
                order_id,
                product_id: line.product_id,
                quantity,
                price_at_purchase: pws.product.price,
            });
        }

        let order = Order {
            id: order_id,
            user_id,
            order_date: Utc::now(),
            status: OrderStatus::Completed,
            total_amount: total,
        };
        unit.insert_order(&order, &order_lines).await?;
        unit.commit().await?;

        Ok(OrderWithLines {
            order,
            lines: order_lines,
        })
    }
}
