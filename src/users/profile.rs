use axum::{Json, debug_handler, extract::State};
use sqlx::SqlitePool;

use crate::{
    AppResult, AppState, AuthenticatedIdentity,
    auth::UserEnvelope,
    directory::{self, ProfileUpdate},
};

#[debug_handler(state = AppState)]
pub(crate) async fn update_profile(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserEnvelope>> {
    let user = directory::update_profile(&db_pool, identity.actor_id, update).await?;
    Ok(Json(UserEnvelope { user }))
}
