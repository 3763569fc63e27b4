use std::sync::Arc;

use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, Config,
    db::{ConnectionRequest, bounded},
    directory,
    error::{CoreError, CoreResult},
};

use super::RequestView;

/// Requests addressed to `actor`, newest first, each with its sender.
pub async fn list_incoming(db_pool: &SqlitePool, actor: Uuid) -> CoreResult<Vec<RequestView>> {
    let requests: Vec<ConnectionRequest> = sqlx::query_as(
        "SELECT id,from_id,to_id,status,created_at FROM connection_requests WHERE to_id=? ORDER BY rowid DESC",
    )
    .bind(actor)
    .fetch_all(db_pool)
    .await?;

    resolve(db_pool, requests, |request| request.from_id).await
}

/// Requests sent by `actor`, newest first, each with its recipient.
pub async fn list_sent(db_pool: &SqlitePool, actor: Uuid) -> CoreResult<Vec<RequestView>> {
    let requests: Vec<ConnectionRequest> = sqlx::query_as(
        "SELECT id,from_id,to_id,status,created_at FROM connection_requests WHERE from_id=? ORDER BY rowid DESC",
    )
    .bind(actor)
    .fetch_all(db_pool)
    .await?;

    resolve(db_pool, requests, |request| request.to_id).await
}

async fn resolve(
    db_pool: &SqlitePool,
    requests: Vec<ConnectionRequest>,
    counterpart_of: impl Fn(&ConnectionRequest) -> Uuid,
) -> CoreResult<Vec<RequestView>> {
    let mut views = Vec::with_capacity(requests.len());
    for request in requests {
        let counterpart = directory::find_public(db_pool, counterpart_of(&request))
            .await?
            .ok_or_else(|| {
                CoreError::Internal(format!("request {} refers to a missing user", request.id))
            })?;
        views.push(RequestView {
            request,
            counterpart,
        });
    }
    Ok(views)
}

#[derive(Serialize)]
pub(crate) struct RequestsEnvelope {
    requests: Vec<RequestView>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn incoming(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<RequestsEnvelope>> {
    let requests = bounded(
        config.storage_timeout,
        list_incoming(&db_pool, identity.actor_id),
    )
    .await?;
    Ok(Json(RequestsEnvelope { requests }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn sent(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<RequestsEnvelope>> {
    let requests = bounded(
        config.storage_timeout,
        list_sent(&db_pool, identity.actor_id),
    )
    .await?;
    Ok(Json(RequestsEnvelope { requests }))
}
