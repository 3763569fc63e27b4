use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, Config, directory,
    error::{CoreError, CoreResult},
    notifier::{ChatEvent, Notifier},
};

use super::MessageView;

/// Appends `text` to the chat as `actor` and fans it out to subscribers.
///
/// The text is stored exactly as sent; it only has to be non-blank.
pub async fn append_message(
    db_pool: &SqlitePool,
    notifier: &Notifier,
    chat_id: Uuid,
    actor: Uuid,
    text: String,
    max_len: usize,
) -> CoreResult<MessageView> {
    let is_participant = sqlx::query("SELECT 1 FROM chats WHERE id=? AND (user_low=? OR user_high=?)")
        .bind(chat_id)
        .bind(actor)
        .bind(actor)
        .fetch_optional(db_pool)
        .await?
        .is_some();
    if !is_participant {
        return Err(CoreError::NotFound("chat"));
    }

    if text.trim().is_empty() {
        return Err(CoreError::Validation("message text must not be empty".to_owned()));
    }
    if text.chars().count() > max_len {
        return Err(CoreError::Validation(format!(
            "message text exceeds {max_len} characters"
        )));
    }

    let sender = directory::find_public(db_pool, actor)
        .await?
        .ok_or(CoreError::NotFound("user"))?;

    let message = MessageView {
        id: Uuid::now_v7(),
        sender,
        text,
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO messages (id,chat_id,sender_id,text,created_at) VALUES (?,?,?,?,?)")
        .bind(message.id)
        .bind(chat_id)
        .bind(actor)
        .bind(&message.text)
        .bind(message.created_at)
        .execute(db_pool)
        .await?;

    debug!(%chat_id, message_id = %message.id, "message appended");

    notifier.publish(
        chat_id,
        ChatEvent::NewMessage {
            chat_id,
            message: message.clone(),
        },
    );

    Ok(message)
}

#[derive(Deserialize)]
pub(crate) struct SendMessageBody {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewMessageEnvelope {
    new_message: MessageView,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    State(config): State<Arc<Config>>,
    Path(chat_id): Path<Uuid>,
    Json(SendMessageBody { text }): Json<SendMessageBody>,
) -> AppResult<(StatusCode, Json<NewMessageEnvelope>)> {
    let new_message = append_message(
        &db_pool,
        &notifier,
        chat_id,
        identity.actor_id,
        text,
        config.max_message_len,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(NewMessageEnvelope { new_message })))
}
