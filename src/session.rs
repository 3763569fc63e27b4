use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use sqlx::SqlitePool;
use tower_sessions::{MemoryStore, Session, SessionStore, session::Id};
use tracing::debug;
use uuid::Uuid;

use crate::{AppError, AppResult, directory};

pub const USER_ID: &str = "user_id";
pub const LAST_SEEN: &str = "last_seen";

/// The already-authenticated caller every core operation acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub actor_id: Uuid,
    pub is_admin: bool,
}

impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
    SqlitePool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized("authentication required"))?;

        let Some(actor_id) = session.get::<Uuid>(USER_ID).await? else {
            return Err(AppError::Unauthorized("authentication required"));
        };

        let db_pool = SqlitePool::from_ref(state);
        let Some(user) = directory::find_public(&db_pool, actor_id).await? else {
            debug!(user_id = %actor_id, "session refers to a deleted user");
            session.flush().await?;
            return Err(AppError::Unauthorized("user not found"));
        };

        Ok(Self {
            actor_id,
            is_admin: user.is_admin,
        })
    }
}

/// Whether the stored session `session_id` is still signed in as `actor`.
/// Fails after logout, after expiry and after a different login on the same cookie.
pub async fn still_signed_in(store: &MemoryStore, session_id: Id, actor: Uuid) -> AppResult<bool> {
    let Some(record) = store.load(&session_id).await? else {
        return Ok(false);
    };
    let signed_in = record
        .data
        .get(USER_ID)
        .and_then(|value| serde_json::from_value::<Uuid>(value.clone()).ok());
    Ok(signed_in == Some(actor))
}
