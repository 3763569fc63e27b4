mod profile;

use std::sync::Arc;

use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, put},
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{AppResult, AppState, AuthenticatedIdentity, Config, db::{PublicUser, bounded}, directory, matches};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/matches", get(list_matches))
        .route("/profile", put(profile::update_profile))
}

#[derive(Serialize)]
struct UsersEnvelope {
    users: Vec<PublicUser>,
}

#[derive(Serialize)]
struct MatchesEnvelope {
    matches: Vec<PublicUser>,
}

#[debug_handler(state = AppState)]
async fn list_users(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<UsersEnvelope>> {
    let users = bounded(
        config.storage_timeout,
        directory::list_others(&db_pool, identity.actor_id),
    )
    .await?;
    Ok(Json(UsersEnvelope { users }))
}

#[debug_handler(state = AppState)]
async fn list_matches(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<MatchesEnvelope>> {
    let matches = bounded(
        config.storage_timeout,
        matches::get_matches(&db_pool, identity.actor_id),
    )
    .await?;
    Ok(Json(MatchesEnvelope { matches }))
}
