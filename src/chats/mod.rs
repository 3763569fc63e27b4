//! Chat store: one append-only message log per participant pair.
//!
//! Non-participants get `NotFound` rather than `Forbidden` so a chat's
//! existence is never revealed to outsiders.

mod chat;
mod msg;
mod read;
pub mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppState, db::PublicUser};

pub use chat::{get_chat, list_for_user};
pub(crate) use chat::ensure_chat;
pub use msg::append_message;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(chat::chats))
        .route("/unread", get(read::unread_count))
        .route("/{chat_id}", get(chat::chat))
        .route("/{chat_id}/message", post(msg::send_message))
        .route("/{chat_id}/read", post(read::mark_read))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub sender: PublicUser,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: Uuid,
    pub participants: Vec<PublicUser>,
    /// In append order.
    pub messages: Vec<MessageView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatView {
    pub fn last_message_id(&self) -> Option<Uuid> {
        self.messages.last().map(|message| message.id)
    }

    pub fn last_activity(&self) -> OffsetDateTime {
        self.messages
            .last()
            .map(|message| message.created_at)
            .unwrap_or(self.created_at)
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.iter().any(|user| user.id == user_id)
    }
}
