use std::sync::Arc;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    routing::{delete, get, put},
};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, Config, CoreError,
    auth::UserEnvelope,
    db::{PublicUser, bounded},
    directory,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}/verify", put(verify_user))
        .route("/users/{user_id}", delete(delete_user))
}

fn require_admin(identity: &AuthenticatedIdentity) -> Result<(), CoreError> {
    if identity.is_admin {
        Ok(())
    } else {
        Err(CoreError::Forbidden("admin access required"))
    }
}

#[derive(Serialize)]
struct UsersEnvelope {
    users: Vec<PublicUser>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Deleted {
    deleted: Uuid,
    requests_removed: u64,
    chats_removed: u64,
}

#[debug_handler(state = AppState)]
async fn list_users(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<UsersEnvelope>> {
    require_admin(&identity)?;
    let users = bounded(config.storage_timeout, directory::list_newest_first(&db_pool)).await?;
    Ok(Json(UsersEnvelope { users }))
}

#[debug_handler(state = AppState)]
async fn verify_user(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserEnvelope>> {
    require_admin(&identity)?;
    let user = directory::set_verified(&db_pool, user_id).await?;
    Ok(Json(UserEnvelope { user }))
}

#[debug_handler(state = AppState)]
async fn delete_user(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Deleted>> {
    require_admin(&identity)?;
    let report = directory::delete_user(&db_pool, user_id).await?;
    Ok(Json(Deleted {
        deleted: user_id,
        requests_removed: report.requests,
        chats_removed: report.chats,
    }))
}
