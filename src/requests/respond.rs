use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, chats,
    db::{self, ConnectionRequest, RequestStatus},
    error::{CoreError, CoreResult},
};

use super::send::RequestEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    fn target(self) -> RequestStatus {
        match self {
            Decision::Accept => RequestStatus::Accepted,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// Moves a pending request addressed to `actor` into its terminal state.
/// Accepting also opens the pair's chat if there is none yet, in the same
/// transaction as the status change.
pub async fn respond_to_request(
    db_pool: &SqlitePool,
    actor: Uuid,
    request_id: Uuid,
    decision: Decision,
) -> CoreResult<ConnectionRequest> {
    let mut tx = db::begin_write(db_pool).await?;

    let Some(mut request) = sqlx::query_as::<_, ConnectionRequest>(
        "SELECT id,from_id,to_id,status,created_at FROM connection_requests WHERE id=?",
    )
    .bind(request_id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Err(CoreError::NotFound("request"));
    };

    if request.to_id != actor {
        return Err(CoreError::Forbidden("only the recipient may respond to a request"));
    }

    if request.status != RequestStatus::Pending {
        return Err(CoreError::InvalidState(format!(
            "request is already {}",
            request.status.as_str()
        )));
    }

    let next = decision.target();
    let updated = sqlx::query("UPDATE connection_requests SET status=? WHERE id=? AND status='pending'")
        .bind(next)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(CoreError::InvalidState(
            "request was answered concurrently".to_owned(),
        ));
    }
    request.status = next;

    if decision == Decision::Accept {
        chats::ensure_chat(&mut tx, request.from_id, request.to_id).await?;
    }

    tx.commit().await?;

    info!(
        request_id = %request.id,
        status = request.status.as_str(),
        "connection request answered"
    );
    Ok(request)
}

pub async fn accept(db_pool: &SqlitePool, actor: Uuid, request_id: Uuid) -> CoreResult<ConnectionRequest> {
    respond_to_request(db_pool, actor, request_id, Decision::Accept).await
}

pub async fn reject(db_pool: &SqlitePool, actor: Uuid, request_id: Uuid) -> CoreResult<ConnectionRequest> {
    respond_to_request(db_pool, actor, request_id, Decision::Reject).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn accept_request(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestEnvelope>> {
    let request = accept(&db_pool, identity.actor_id, request_id).await?;
    Ok(Json(RequestEnvelope { request }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn reject_request(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestEnvelope>> {
    let request = reject(&db_pool, identity.actor_id, request_id).await?;
    Ok(Json(RequestEnvelope { request }))
}
