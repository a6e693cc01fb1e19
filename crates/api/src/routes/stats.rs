//! Aggregate entity counts across both stores.

use std::sync::Arc;

use activity::ActivityLog;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct StatsResponse {
    pub users: u64,
    pub products: u64,
    pub orders: u64,
    pub logs: u64,
}

/// GET /stats — entity counts for dashboards.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
) -> Result<Json<StatsResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let users = state.store.count_users().await?;
    let products = state.store.count_products().await?;
    let orders = state.store.count_orders().await?;
    let logs = state.activity.count().await?;
    Ok(Json(StatsResponse {
        users,
        products,
        orders,
        logs,
    }))
}
