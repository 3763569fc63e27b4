//! Best-effort fan-out of new chat messages. No acknowledgement, no backlog.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::chats::MessageView;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage { chat_id: Uuid, message: MessageView },
}

#[derive(Clone)]
pub struct Notifier {
    channels: Arc<DashMap<Uuid, broadcast::Sender<ChatEvent>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Joins the channel of `chat_id`. Dropping the subscription leaves it.
    pub fn subscribe(&self, chat_id: Uuid) -> Subscription {
        let rx = self
            .channels
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        trace!(%chat_id, "subscribed");
        Subscription {
            chat_id,
            rx: Some(rx),
            notifier: self.clone(),
        }
    }

    /// Never blocks and never fails the caller.
    pub fn publish(&self, chat_id: Uuid, event: ChatEvent) {
        let Some(tx) = self.channels.get(&chat_id).map(|entry| entry.value().clone()) else {
            trace!(%chat_id, "no subscribers");
            return;
        };

        match tx.send(event) {
            Ok(receivers) => debug!(%chat_id, receivers, "broadcast chat event"),
            Err(_) => {
                debug!(%chat_id, "chat event dropped, no live receivers");
                self.prune(chat_id);
            }
        }
    }

    pub fn subscriber_count(&self, chat_id: Uuid) -> usize {
        self.channels
            .get(&chat_id)
            .map(|entry| entry.receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn prune(&self, chat_id: Uuid) {
        self.channels
            .remove_if(&chat_id, |_, tx| tx.receiver_count() == 0);
    }
}

pub struct Subscription {
    chat_id: Uuid,
    rx: Option<broadcast::Receiver<ChatEvent>>,
    notifier: Notifier,
}

impl Subscription {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub async fn recv(&mut self) -> Result<ChatEvent, RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.rx.take());
        self.notifier.prune(self.chat_id);
        trace!(chat_id = %self.chat_id, "unsubscribed");
    }
}
