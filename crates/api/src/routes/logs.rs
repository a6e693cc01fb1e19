//! Activity log query endpoint.

use std::sync::Arc;

use activity::{ActivityEvent, ActivityLog};
use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::Store;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

fn default_limit() -> usize {
    50
}

#[derive(Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct LogEntryResponse {
    pub id: Uuid,
    pub actor: String,
    pub action: &'static str,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityEvent> for LogEntryResponse {
    fn from(event: ActivityEvent) -> Self {
        Self {
            id: event.id,
            actor: event.actor.to_string(),
            action: event.action.as_str(),
            detail: event.detail,
            timestamp: event.timestamp,
        }
    }
}

/// GET /logs — recent activity events, newest first, optionally
/// bounded by a time range.
#[tracing::instrument(skip(state, query))]
pub async fn list<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<LogEntryResponse>>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let events = state
        .activity
        .query(query.limit, query.start_time, query.end_time)
        .await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}
