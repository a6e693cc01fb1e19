//! User CRUD endpoints.

use std::sync::Arc;

use activity::{ActionKind, ActivityEvent, ActivityLog, Actor};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use store::{NewUser, Store, User, UserUpdate};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::routes::{MessageResponse, PageParams};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.as_uuid(),
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct UsersListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

// -- Handlers --

/// POST /users — create a user.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
        })
        .await?;
    state
        .activity
        .record(ActivityEvent::new(
            Actor::User(user.id),
            ActionKind::CreateUser,
            format!("Created user {}", user.username),
        ))
        .await;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users — paged list.
#[tracing::instrument(skip(state, params))]
pub async fn list<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<UsersListResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let page = state.store.list_users(params.into()).await?;
    Ok(Json(UsersListResponse {
        total: page.total,
        pages: page.page_count(),
        current_page: page.page,
        users: page.items.into_iter().map(Into::into).collect(),
    }))
}

/// GET /users/:id — fetch one user.
#[tracing::instrument(skip(state))]
pub async fn get<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let user = state
        .store
        .get_user(UserId::from_uuid(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {id} not found")))?;
    Ok(Json(user.into()))
}

/// PUT /users/:id — partial update.
#[tracing::instrument(skip(state, req))]
pub async fn update<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let user_id = UserId::from_uuid(id);
    let user = state
        .store
        .update_user(
            user_id,
            UserUpdate {
                username: req.username,
                email: req.email,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {id} not found")))?;
    state
        .activity
        .record(ActivityEvent::new(
            Actor::User(user_id),
            ActionKind::UpdateUser,
            format!("Updated user {}", user.username),
        ))
        .await;
    Ok(Json(user.into()))
}

/// DELETE /users/:id — delete a user without orders.
#[tracing::instrument(skip(state))]
pub async fn delete<S, L>(
    State(state): State<Arc<AppState<S, L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError>
where
    S: Store + Clone + 'static,
    L: ActivityLog + Clone + 'static,
{
    let deleted = state.store.delete_user(UserId::from_uuid(id)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("User {id} not found")));
    }
    state
        .activity
        .record(ActivityEvent::new(
            Actor::Admin,
            ActionKind::DeleteUser,
            format!("Deleted user {id}"),
        ))
        .await;
    Ok(Json(MessageResponse {
        message: "User deleted",
    }))
}
