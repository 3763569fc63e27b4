use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, Config, db::bounded, unread::UnreadMarkers,
};

use super::{get_chat, list_for_user};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkedRead {
    chat_id: Uuid,
    last_seen: Option<Uuid>,
}

#[derive(Serialize)]
pub(crate) struct UnreadCount {
    unread: usize,
}

#[debug_handler(state = AppState)]
pub(crate) async fn mark_read(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<MarkedRead>> {
    let chat = bounded(
        config.storage_timeout,
        get_chat(&db_pool, chat_id, identity.actor_id),
    )
    .await?;

    let mut markers = UnreadMarkers::load(&session).await?;
    if markers.mark_read(chat_id, chat.last_message_id()) {
        markers.store(&session).await?;
    }

    Ok(Json(MarkedRead {
        chat_id,
        last_seen: markers.last_seen(chat_id),
    }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn unread_count(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
) -> AppResult<Json<UnreadCount>> {
    let chats = bounded(
        config.storage_timeout,
        list_for_user(&db_pool, identity.actor_id),
    )
    .await?;
    let markers = UnreadMarkers::load(&session).await?;

    let unread = markers.unread_count(
        chats
            .iter()
            .map(|chat| (chat.id, chat.last_message_id())),
    );
    Ok(Json(UnreadCount { unread }))
}
