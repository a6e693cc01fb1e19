//! Order endpoints. Placement delegates to the transaction engine;
//! everything else is repository access.

use std::sync::Arc;

use activity::{ActionKind, ActivityEvent, ActivityLog, Actor};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use engine::LineRequest;
use serde::{Deserialize, Serialize};
use store::{OrderStatus, OrderWithLines, Store};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::routes::{MessageResponse, PageParams};

// -- Request types --

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize, Default)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: String,
    pub total_amount_cents: i64,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderWithLines> for OrderResponse {
    fn from(owl: OrderWithLines) -> Self {
        Self {
            id: owl.order.id.as_uuid(),
            user_id: owl.order.user_id.as_uuid(),
            order_date: owl.order.order_date,
            status: owl.order.status.to_string(),
            total_amount_cents: owl.order.total_amount.cents(),
            items: owl
                .lines
                .into_iter()
                .map(|line| OrderItemResponse {
                    product_id: line.product_id.as_uuid(),
                    quantity: line.quantity,
                    price_cents: line.price_at_purchase.cents(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct OrdersListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

// -- Handlers --

/// POST /orders — place an order atomically through the engine.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let user_id = req
        .user_id
        .ok_or_else(|| ApiError::BadRequest("missing user_id".to_string()))?;
    let lines = req
        .items
        .into_iter()
        .map(|item| LineRequest {
            product_id: ProductId::from_uuid(item.product_id),
            quantity: item.quantity,
        })
        .collect();
    let placed = state
        .engine
        .place_order(UserId::from_uuid(user_id), lines)
        .await?;
    Ok((StatusCode::CREATED, Json(placed.into())))
}

/// GET /orders — paged list with lines embedded.
#[tracing::instrument(skip(state, params))]
pub async fn list<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<OrdersListResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let page = state.store.list_orders(params.into()).await?;
    Ok(Json(OrdersListResponse {
        total: page.total,
        pages: page.page_count(),
        current_page: page.page,
        orders: page.items.into_iter().map(Into::into).collect(),
    }))
}

/// GET /orders/:id — fetch one order with its lines.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let owl = state
        .store
        .get_order(OrderId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(owl.into()))
}

/// PUT /orders/:id — change the order status. Cancelling never
/// restores stock.
#[tracing::instrument(skip(state, req))]
pub async fn update<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let raw = req
        .status
        .ok_or_else(|| ApiError::BadRequest("missing status".to_string()))?;
    let status = OrderStatus::parse(&raw)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid status {raw:?}")))?;
    let owl = state
        .store
        .update_status(OrderId::from_uuid(id), status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    state
        .activity
        .record(ActivityEvent::new(
            Actor::User(owl.order.user_id),
            ActionKind::UpdateOrder,
            format!("Order {id} status set to {status}"),
        ))
        .await;
    Ok(Json(owl.into()))
}

/// DELETE /orders/:id — delete an order and its lines. Stock is never
/// restored.
#[tracing::instrument(skip(state))]
pub async fn delete<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let deleted = state.store.delete_order(OrderId::from_uuid(id)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }
    state
        .activity
        .record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::DeleteOrder,
            format!("Deleted order {id}"),
        ))
        .await;
    Ok(Json(MessageResponse {
        message: "Order deleted",
    }))
}
