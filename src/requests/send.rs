use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity,
    db::{ConnectionRequest, RequestStatus},
    directory,
    error::{CoreError, CoreResult},
};

const DUPLICATE_REQUEST: &str = "request already sent or accepted";

pub async fn send_request(db_pool: &SqlitePool, from: Uuid, to: Uuid) -> CoreResult<ConnectionRequest> {
    if from == to {
        return Err(CoreError::Validation(
            "cannot send a request to yourself".to_owned(),
        ));
    }

    if directory::find_public(db_pool, to).await?.is_none() {
        return Err(CoreError::NotFound("user"));
    }

    let existing = sqlx::query("SELECT 1 FROM connection_requests WHERE from_id=? AND to_id=? AND status IN ('pending','accepted')")
        .bind(from)
        .bind(to)
        .fetch_optional(db_pool)
        .await?;
    if existing.is_some() {
        return Err(CoreError::Conflict(DUPLICATE_REQUEST.to_owned()));
    }

    let request = ConnectionRequest {
        id: Uuid::now_v7(),
        from_id: from,
        to_id: to,
        status: RequestStatus::Pending,
        created_at: OffsetDateTime::now_utc(),
    };

    // a concurrent duplicate that passed the check above trips the partial unique index
    sqlx::query("INSERT INTO connection_requests (id,from_id,to_id,status,created_at) VALUES (?,?,?,?,?)")
        .bind(request.id)
        .bind(request.from_id)
        .bind(request.to_id)
        .bind(request.status)
        .bind(request.created_at)
        .execute(db_pool)
        .await
        .map_err(|err| match CoreError::from(err) {
            CoreError::Conflict(_) => CoreError::Conflict(DUPLICATE_REQUEST.to_owned()),
            other => other,
        })?;

    info!(request_id = %request.id, from = %from, to = %to, "connection request sent");
    Ok(request)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendBody {
    to_user_id: Uuid,
}

#[derive(Serialize)]
pub(crate) struct RequestEnvelope {
    pub(crate) request: ConnectionRequest,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Json(SendBody { to_user_id }): Json<SendBody>,
) -> AppResult<(StatusCode, Json<RequestEnvelope>)> {
    let request = send_request(&db_pool, identity.actor_id, to_user_id).await?;
    Ok((StatusCode::CREATED, Json(RequestEnvelope { request })))
}
