use std::sync::Arc;

use axum::{Json, debug_handler, extract::State};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{AppError, AppResult, AppState, Config, CoreError, db::bounded, directory};

use super::{UserEnvelope, begin_session, password::verify_password_blocking};

#[derive(Deserialize)]
pub(crate) struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Json(LoginBody { email, password }): Json<LoginBody>,
) -> AppResult<Json<UserEnvelope>> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(CoreError::Validation("please provide email and password".to_owned()).into());
    }

    let Some(user) = bounded(config.storage_timeout, directory::find_by_email(&db_pool, &email)).await? else {
        return Err(AppError::Unauthorized("invalid credentials"));
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized("invalid credentials"));
    }

    begin_session(&session, user.id).await?;
    info!(user_id = %user.id, "login");
    Ok(Json(UserEnvelope { user: user.into() }))
}
