use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tower_sessions::{MemoryStore, Session, session::Id};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    AppError, AppResult, AppState, AuthenticatedIdentity, Config, CoreError,
    db::bounded,
    notifier::{ChatEvent, Notifier},
    session::still_signed_in,
};

use super::{ChatView, MessageView, get_chat};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
enum ClientFrame {
    Join { chat_id: Uuid },
    Leave { chat_id: Uuid },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub(crate) enum ServerFrame {
    Joined { chat_id: Uuid },
    Left { chat_id: Uuid },
    NewMessage { chat_id: Uuid, message: MessageView },
    Snapshot { chat: ChatView },
    Error { chat_id: Option<Uuid>, error: String },
}

impl From<ChatEvent> for ServerFrame {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::NewMessage { chat_id, message } => ServerFrame::NewMessage { chat_id, message },
        }
    }
}

#[debug_handler(state = AppState)]
pub async fn chat_ws(
    identity: AuthenticatedIdentity,
    State(db_pool): State<SqlitePool>,
    State(notifier): State<Notifier>,
    State(session_store): State<MemoryStore>,
    State(config): State<Arc<Config>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let Some(session_id) = session.id() else {
        return Err(AppError::Unauthorized("authentication required"));
    };
    let login = Login {
        actor: identity.actor_id,
        session_id,
        store: session_store,
    };

    Ok(ws.on_upgrade(async move |socket| run_socket(socket, login, db_pool, notifier, config).await))
}

/// The session a socket was opened under, re-checked while the socket lives.
struct Login {
    actor: Uuid,
    session_id: Id,
    store: MemoryStore,
}

async fn run_socket(
    socket: WebSocket,
    login: Login,
    db_pool: SqlitePool,
    notifier: Notifier,
    config: Arc<Config>,
) {
    let actor = login.actor;
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerFrame>(64);

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, "failed to encode websocket frame");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    info!(user_id = %actor, "websocket connected");
    let mut feeds: HashMap<Uuid, ChatFeed> = HashMap::new();
    let mut session_check = tokio::time::interval(config.refresh_interval);
    session_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut writer_done = false;

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(msg)) = incoming else {
                    break;
                };
                let frame = match msg {
                    Message::Text(text) => serde_json::from_str::<ClientFrame>(text.as_str()),
                    Message::Close(_) => break,
                    _ => continue,
                };
                let Ok(frame) = frame else {
                    let _ = out_tx
                        .send(ServerFrame::Error { chat_id: None, error: "unrecognized frame".to_owned() })
                        .await;
                    continue;
                };

                match frame {
                    ClientFrame::Join { chat_id } => {
                        if feeds.get(&chat_id).is_some_and(|feed| !feed.is_finished()) {
                            let _ = out_tx.send(ServerFrame::Joined { chat_id }).await;
                            continue;
                        }
                        match bounded(config.storage_timeout, get_chat(&db_pool, chat_id, actor)).await {
                            Ok(_) => {
                                feeds.insert(
                                    chat_id,
                                    ChatFeed::spawn(
                                        chat_id,
                                        actor,
                                        db_pool.clone(),
                                        &notifier,
                                        config.refresh_interval,
                                        config.storage_timeout,
                                        out_tx.clone(),
                                    ),
                                );
                                debug!(user_id = %actor, %chat_id, "joined chat");
                                let _ = out_tx.send(ServerFrame::Joined { chat_id }).await;
                            }
                            Err(err) => {
                                let _ = out_tx
                                    .send(ServerFrame::Error { chat_id: Some(chat_id), error: err.to_string() })
                                    .await;
                            }
                        }
                    }
                    ClientFrame::Leave { chat_id } => {
                        if feeds.remove(&chat_id).is_some() {
                            debug!(user_id = %actor, %chat_id, "left chat");
                        }
                        let _ = out_tx.send(ServerFrame::Left { chat_id }).await;
                    }
                }
            }
            _ = session_check.tick() => {
                match still_signed_in(&login.store, login.session_id, actor).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(user_id = %actor, "session ended, closing websocket");
                        let _ = out_tx
                            .send(ServerFrame::Error { chat_id: None, error: "session ended".to_owned() })
                            .await;
                        break;
                    }
                    Err(err) => warn!(user_id = %actor, error = ?err, "session check failed"),
                }
            }
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    // the writer drains and closes once every sender is gone
    drop(feeds);
    drop(out_tx);
    if !writer_done && tokio::time::timeout(Duration::from_secs(1), &mut writer).await.is_err() {
        writer.abort();
    }
    info!(user_id = %actor, "websocket closed");
}

/// Background delivery for one joined chat. Dropping it stops the task.
pub(crate) struct ChatFeed {
    handle: JoinHandle<()>,
}

impl ChatFeed {
    pub(crate) fn spawn(
        chat_id: Uuid,
        actor: Uuid,
        db_pool: SqlitePool,
        notifier: &Notifier,
        refresh_interval: Duration,
        storage_timeout: Duration,
        out: mpsc::Sender<ServerFrame>,
    ) -> Self {
        let mut subscription = notifier.subscribe(chat_id);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Ok(event) => {
                            if out.send(event.into()).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            debug!(%chat_id, missed, "feed lagged, resyncing");
                            ticker.reset_immediately();
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = ticker.tick() => {
                        match bounded(storage_timeout, get_chat(&db_pool, chat_id, actor)).await {
                            Ok(chat) => {
                                if out.send(ServerFrame::Snapshot { chat }).await.is_err() {
                                    break;
                                }
                            }
                            Err(CoreError::NotFound(_)) => {
                                let _ = out
                                    .send(ServerFrame::Error { chat_id: Some(chat_id), error: "chat not found".to_owned() })
                                    .await;
                                break;
                            }
                            Err(err) => warn!(%chat_id, error = %err, "chat refresh failed"),
                        }
                    }
                }
            }
        });

        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ChatFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
