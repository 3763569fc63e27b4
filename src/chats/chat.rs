use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppResult, AppState, AuthenticatedIdentity, Config,
    db::{ChatRow, Message, PublicUser, bounded, ordered_pair},
    directory,
    error::{CoreError, CoreResult},
    unread::UnreadMarkers,
};

use super::{ChatView, MessageView};

pub async fn get_chat(db_pool: &SqlitePool, chat_id: Uuid, actor: Uuid) -> CoreResult<ChatView> {
    let Some(row) = sqlx::query_as::<_, ChatRow>(
        "SELECT id,user_low,user_high,created_at FROM chats WHERE id=? AND (user_low=? OR user_high=?)",
    )
    .bind(chat_id)
    .bind(actor)
    .bind(actor)
    .fetch_optional(db_pool)
    .await?
    else {
        return Err(CoreError::NotFound("chat"));
    };

    load_view(db_pool, row).await
}

/// Every chat `actor` takes part in, most recently active first.
pub async fn list_for_user(db_pool: &SqlitePool, actor: Uuid) -> CoreResult<Vec<ChatView>> {
    let rows: Vec<ChatRow> = sqlx::query_as(
        "SELECT id,user_low,user_high,created_at FROM chats WHERE user_low=? OR user_high=? ORDER BY rowid DESC",
    )
    .bind(actor)
    .bind(actor)
    .fetch_all(db_pool)
    .await?;

    let mut chats = Vec::with_capacity(rows.len());
    for row in rows {
        chats.push(load_view(db_pool, row).await?);
    }
    chats.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
    Ok(chats)
}

async fn load_view(db_pool: &SqlitePool, row: ChatRow) -> CoreResult<ChatView> {
    let mut participants = Vec::with_capacity(2);
    for user_id in [row.user_low, row.user_high] {
        let user = directory::find_public(db_pool, user_id)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("chat {} refers to a missing user", row.id)))?;
        participants.push(user);
    }

    let messages: Vec<Message> = sqlx::query_as(
        "SELECT id,chat_id,sender_id,text,created_at FROM messages WHERE chat_id=? ORDER BY seq",
    )
    .bind(row.id)
    .fetch_all(db_pool)
    .await?;

    let messages = messages
        .into_iter()
        .map(|message| {
            let sender = sender_of(&participants, &message)?;
            Ok(MessageView {
                id: message.id,
                sender,
                text: message.text,
                created_at: message.created_at,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(ChatView {
        id: row.id,
        participants,
        messages,
        created_at: row.created_at,
    })
}

fn sender_of(participants: &[PublicUser], message: &Message) -> CoreResult<PublicUser> {
    participants
        .iter()
        .find(|user| user.id == message.sender_id)
        .cloned()
        .ok_or_else(|| {
            CoreError::Internal(format!(
                "message {} was sent by a non-participant",
                message.id
            ))
        })
}

/// Returns the chat for the unordered pair `{a, b}`, creating it if missing.
/// A unique-index rejection means another creator won; their chat is returned.
pub(crate) async fn ensure_chat(conn: &mut SqliteConnection, a: Uuid, b: Uuid) -> CoreResult<Uuid> {
    let (low, high) = ordered_pair(a, b);

    if let Some(existing) = find_pair(conn, low, high).await? {
        return Ok(existing);
    }

    let id = Uuid::now_v7();
    let inserted = sqlx::query("INSERT INTO chats (id,user_low,user_high,created_at) VALUES (?,?,?,?)")
        .bind(id)
        .bind(low)
        .bind(high)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *conn)
        .await;

    match inserted.map_err(CoreError::from) {
        Ok(_) => {
            info!(chat_id = %id, %low, %high, "chat created");
            Ok(id)
        }
        Err(CoreError::Conflict(_)) => find_pair(conn, low, high)
            .await?
            .ok_or_else(|| CoreError::Internal("chat vanished after conflicting insert".to_owned())),
        Err(err) => Err(err),
    }
}

async fn find_pair(conn: &mut SqliteConnection, low: Uuid, high: Uuid) -> CoreResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM chats WHERE user_low=? AND user_high=?")
        .bind(low)
        .bind(high)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(id,)| id))
}

#[derive(Serialize)]
pub(crate) struct ChatEntry {
    #[serde(flatten)]
    chat: ChatView,
    unread: bool,
}

#[derive(Serialize)]
pub(crate) struct ChatsEnvelope {
    chats: Vec<ChatEntry>,
}

#[derive(Serialize)]
pub(crate) struct ChatEnvelope {
    chat: ChatView,
}

#[debug_handler(state = AppState)]
pub(crate) async fn chats(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
) -> AppResult<Json<ChatsEnvelope>> {
    let chats = bounded(
        config.storage_timeout,
        list_for_user(&db_pool, identity.actor_id),
    )
    .await?;
    let markers = UnreadMarkers::load(&session).await?;

    let chats = chats
        .into_iter()
        .map(|chat| ChatEntry {
            unread: markers.is_unread(chat.id, chat.last_message_id()),
            chat,
        })
        .collect();
    Ok(Json(ChatsEnvelope { chats }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<ChatEnvelope>> {
    let chat = bounded(
        config.storage_timeout,
        get_chat(&db_pool, chat_id, identity.actor_id),
    )
    .await?;
    Ok(Json(ChatEnvelope { chat }))
}
