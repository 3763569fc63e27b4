mod login;
mod logout;
mod password;
mod register;

use axum::{
    Json, Router, debug_handler,
    extract::State,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, AppState, CoreError, db::PublicUser, directory, session::USER_ID};

pub use password::{hash_password, verify_password};
pub(crate) use password::hash_password_blocking;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/logout", post(logout::logout))
        .route("/me", get(me))
}

#[derive(serde::Serialize)]
pub(crate) struct UserEnvelope {
    pub(crate) user: PublicUser,
}

/// Starts a fresh session for `user_id`, dropping anything the previous one held.
async fn begin_session(session: &Session, user_id: Uuid) -> AppResult<()> {
    session.flush().await?;
    session.insert(USER_ID, user_id).await?;
    Ok(())
}

#[debug_handler(state = AppState)]
async fn me(
    identity: crate::AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
) -> AppResult<Json<UserEnvelope>> {
    let user = directory::find_public(&db_pool, identity.actor_id)
        .await?
        .ok_or(CoreError::NotFound("user"))?;
    Ok(Json(UserEnvelope { user }))
}
