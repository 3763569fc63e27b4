use axum::{Json, debug_handler, extract::State, http::StatusCode};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    AppResult, AppState, CoreError,
    directory::{self, NewUser},
};

use super::{UserEnvelope, begin_session, password::hash_password_blocking};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    offered_skills: Vec<String>,
    #[serde(default)]
    desired_skills: Vec<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<UserEnvelope>)> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(CoreError::Validation("please provide all required fields".to_owned()).into());
    }

    let password_hash = hash_password_blocking(body.password).await?;
    let user = directory::create_user(
        &db_pool,
        NewUser {
            name: body.name,
            email: body.email,
            password_hash,
            bio: body.bio,
            offered_skills: body.offered_skills,
            desired_skills: body.desired_skills,
            is_admin: false,
            verified: false,
        },
    )
    .await?;

    begin_session(&session, user.id).await?;
    Ok((StatusCode::CREATED, Json(UserEnvelope { user })))
}
