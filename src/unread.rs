use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::session::LAST_SEEN;

/// Last message seen per chat, held in the viewer's session only.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadMarkers {
    last_seen: HashMap<Uuid, Uuid>,
}

impl UnreadMarkers {
    pub fn is_unread(&self, chat_id: Uuid, last_message_id: Option<Uuid>) -> bool {
        match last_message_id {
            Some(last) => self.last_seen.get(&chat_id) != Some(&last),
            None => false,
        }
    }

    /// Records `last_message_id` as seen. Empty chats have nothing to mark.
    pub fn mark_read(&mut self, chat_id: Uuid, last_message_id: Option<Uuid>) -> bool {
        match last_message_id {
            Some(last) => {
                self.last_seen.insert(chat_id, last);
                true
            }
            None => false,
        }
    }

    pub fn last_seen(&self, chat_id: Uuid) -> Option<Uuid> {
        self.last_seen.get(&chat_id).copied()
    }

    pub fn unread_count<I>(&self, chats: I) -> usize
    where
        I: IntoIterator<Item = (Uuid, Option<Uuid>)>,
    {
        chats
            .into_iter()
            .filter(|(chat_id, last)| self.is_unread(*chat_id, *last))
            .count()
    }

    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(session.get(LAST_SEEN).await?.unwrap_or_default())
    }

    pub async fn store(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(LAST_SEEN, self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chat_is_never_unread() {
        let markers = UnreadMarkers::default();
        assert!(!markers.is_unread(Uuid::now_v7(), None));
    }

    #[test]
    fn unseen_chat_with_messages_is_unread() {
        let markers = UnreadMarkers::default();
        assert!(markers.is_unread(Uuid::now_v7(), Some(Uuid::now_v7())));
    }

    #[test]
    fn marking_read_clears_until_next_message() {
        let mut markers = UnreadMarkers::default();
        let chat = Uuid::now_v7();
        let first = Uuid::now_v7();

        assert!(markers.mark_read(chat, Some(first)));
        assert!(!markers.is_unread(chat, Some(first)));

        let second = Uuid::now_v7();
        assert!(markers.is_unread(chat, Some(second)));
    }

    #[test]
    fn mark_read_on_empty_chat_records_nothing() {
        let mut markers = UnreadMarkers::default();
        let chat = Uuid::now_v7();
        assert!(!markers.mark_read(chat, None));
        assert_eq!(markers.last_seen(chat), None);
    }

    #[test]
    fn unread_count_spans_chats() {
        let mut markers = UnreadMarkers::default();
        let (seen, unseen, empty) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let seen_last = Uuid::now_v7();
        markers.mark_read(seen, Some(seen_last));

        let count = markers.unread_count([
            (seen, Some(seen_last)),
            (unseen, Some(Uuid::now_v7())),
            (empty, None),
        ]);
        assert_eq!(count, 1);
    }

    #[test]
    fn markers_survive_session_serialization() {
        let mut markers = UnreadMarkers::default();
        markers.mark_read(Uuid::now_v7(), Some(Uuid::now_v7()));
        let json = serde_json::to_value(&markers).unwrap();
        let back: UnreadMarkers = serde_json::from_value(json).unwrap();
        assert_eq!(back, markers);
    }
}
