//! Product CRUD endpoints (stock embedded).

use std::sync::Arc;

use activity::{ActionKind, ActivityEvent, ActivityLog, Actor};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{NewProduct, ProductUpdate, ProductWithStock, Store};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::routes::{MessageResponse, PageParams};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub sku: String,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Deserialize, Default)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub sku: String,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ProductWithStock> for ProductResponse {
    fn from(pws: ProductWithStock) -> Self {
        let stock = pws.quantity();
        Self {
            id: pws.product.id.as_uuid(),
            name: pws.product.name,
            description: pws.product.description,
            price_cents: pws.product.price.cents(),
            sku: pws.product.sku,
            stock,
            created_at: pws.product.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProductsListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

fn check_non_negative(price_cents: Option<i64>, stock: Option<i32>) -> Result<(), ApiError> {
    if price_cents.is_some_and(|p| p < 0) {
        return Err(ApiError::BadRequest("price must be non-negative".to_string()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(ApiError::BadRequest("stock must be non-negative".to_string()));
    }
    Ok(())
}

// -- Handlers --

/// POST /products — create a product with its initial stock.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    check_non_negative(Some(req.price_cents), Some(req.stock))?;
    let created = state
        .store
        .create_product(NewProduct {
            name: req.name,
            description: req.description,
            price: Money::from_cents(req.price_cents),
            sku: req.sku,
            initial_stock: req.stock,
        })
        .await?;
    state
        .activity
        .record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::CreateProduct,
            format!("Created product {}", created.product.name),
        ))
        .await;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /products — paged list with stock embedded.
#[tracing::instrument(skip(state, params))]
pub async fn list<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductsListResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let page = state.store.list_products(params.into()).await?;
    Ok(Json(ProductsListResponse {
        total: page.total,
        pages: page.page_count(),
        current_page: page.page,
        products: page.items.into_iter().map(Into::into).collect(),
    }))
}

/// GET /products/:id — fetch one product.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let pws = state
        .store
        .get_product_with_stock(ProductId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(pws.into()))
}

/// PUT /products/:id — partial update; `stock` is the administrative
/// stock-adjustment path.
#[tracing::instrument(skip(state, req))]
pub async fn update<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    check_non_negative(req.price_cents, req.stock)?;
    let pws = state
        .store
        .update_product(
            ProductId::from_uuid(id),
            ProductUpdate {
                name: req.name,
                description: req.description,
                price: req.price_cents.map(Money::from_cents),
                sku: req.sku,
                stock: req.stock,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    state
        .activity
        .record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::UpdateProduct,
            format!("Updated product {}", pws.product.name),
        ))
        .await;
    Ok(Json(pws.into()))
}

/// DELETE /products/:id — delete a product and its stock record.
#[tracing::instrument(skip(state))]
pub async fn delete<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let deleted = state
        .store
        .delete_product(ProductId::from_uuid(id))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("Product {id} not found")));
    }
    state
        .activity
        .record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::DeleteProduct,
            format!("Deleted product {id}"),
        ))
        .await;
    Ok(Json(MessageResponse {
        message: "Product deleted",
    }))
}
