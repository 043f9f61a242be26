//! Message reconciliation log.
//!
//! Holds the ordered messages of the open room and merges optimistic local
//! entries with their server-confirmed counterparts. Every mutation returns a
//! [`LogChange`] describing the affected positions so the view can render
//! incrementally.

use chrono::{DateTime, Duration, Utc};

use super::message::{ChatMessage, MessageId, Origin, PendingToken};
use crate::{ChatError, Result};

/// Change produced by a log mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChange {
    /// Entry appended at the given index.
    Appended(usize),
    /// Entry at the given index replaced in place.
    Replaced(usize),
    /// Entries at the given indices changed their origin.
    Updated(Vec<usize>),
    /// Whole log replaced.
    Reset,
    /// Log emptied.
    Cleared,
    /// Nothing changed.
    Unchanged,
}

/// Ordered message log for one room.
#[derive(Debug, Default)]
pub struct ReconciliationLog {
    room_id: Option<i64>,
    self_id: Option<i64>,
    entries: Vec<ChatMessage>,
}

impl ReconciliationLog {
    /// Create an empty log not bound to any room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Room the log currently belongs to.
    pub fn room_id(&self) -> Option<i64> {
        self.room_id
    }

    /// Set the id of the signed-in user.
    pub fn set_self_id(&mut self, self_id: Option<i64>) {
        self.self_id = self_id;
    }

    /// All entries in display order.
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Entry at the given index.
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.entries.get(index)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of placeholders still waiting for the server.
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.origin == Origin::LocalPending)
            .count()
    }

    /// Replace the whole log with a room's fetched history.
    pub fn replace_all(&mut self, room_id: i64, messages: Vec<ChatMessage>) -> LogChange {
        self.room_id = Some(room_id);
        self.entries = messages;
        LogChange::Reset
    }

    /// Drop all entries and unbind from the room.
    pub fn clear(&mut self) -> LogChange {
        self.room_id = None;
        self.entries.clear();
        LogChange::Cleared
    }

    /// Append an optimistic placeholder for text the user just sent.
    ///
    /// Fails only when no room is bound.
    pub fn append_optimistic(
        &mut self,
        text: &str,
        self_id: i64,
        self_name: &str,
    ) -> Result<(PendingToken, LogChange)> {
        let room_id = self
            .room_id
            .ok_or_else(|| ChatError::Validation("no chat room selected".to_string()))?;
        self.self_id = Some(self_id);

        let token = PendingToken::new();
        self.entries
            .push(ChatMessage::pending(room_id, token, self_id, self_name, text));
        Ok((token, LogChange::Appended(self.entries.len() - 1)))
    }

    /// Append a system notice. Never deduplicated.
    pub fn append_system(&mut self, content: &str, sent_at: DateTime<Utc>) -> LogChange {
        let room_id = self.room_id.unwrap_or_default();
        self.entries
            .push(ChatMessage::system(room_id, content, sent_at));
        LogChange::Appended(self.entries.len() - 1)
    }

    /// Merge a message received from the server.
    ///
    /// A confirmation of one of our own placeholders takes the placeholder's
    /// position; anything else is appended. A server id already in the log
    /// is ignored.
    pub fn reconcile_inbound(&mut self, message: ChatMessage) -> LogChange {
        if message.origin == Origin::System {
            self.entries.push(message);
            return LogChange::Appended(self.entries.len() - 1);
        }

        if let Some(id) = message.server_id() {
            if self.entries.iter().any(|e| e.server_id() == Some(id)) {
                tracing::debug!("Ignoring duplicate message {}", id);
                return LogChange::Unchanged;
            }
        }

        if let Some(index) = self.find_placeholder(&message) {
            self.entries[index] = message;
            return LogChange::Replaced(index);
        }

        self.entries.push(message);
        LogChange::Appended(self.entries.len() - 1)
    }

    /// Mark placeholders older than `ttl` as expired.
    pub fn expire_pending(&mut self, now: DateTime<Utc>, ttl: Duration) -> LogChange {
        let mut expired = Vec::new();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.origin == Origin::LocalPending && entry.sent_at + ttl <= now {
                entry.origin = Origin::Expired;
                expired.push(index);
            }
        }

        if expired.is_empty() {
            LogChange::Unchanged
        } else {
            tracing::debug!("Expired {} unconfirmed message(s)", expired.len());
            LogChange::Updated(expired)
        }
    }

    /// Find the placeholder a confirmed message from ourselves stands for.
    ///
    /// An echoed correlation token decides alone. Without one, the oldest
    /// unconfirmed entry with identical body text matches.
    fn find_placeholder(&self, message: &ChatMessage) -> Option<usize> {
        let self_id = self.self_id?;
        if !message.is_from(self_id) {
            return None;
        }

        let mut candidates = self.entries.iter().enumerate().filter(|(_, e)| {
            e.origin.is_unconfirmed() && matches!(e.id, Some(MessageId::Pending(_)))
        });

        match message.correlation {
            Some(token) => candidates
                .find(|(_, e)| e.correlation == Some(token))
                .map(|(i, _)| i),
            None => candidates
                .find(|(_, e)| e.content == message.content)
                .map(|(i, _)| i),
        }
    }
}
