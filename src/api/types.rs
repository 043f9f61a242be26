//! Response bodies of the REST API.

use chrono::Utc;
use serde::Deserialize;

use crate::chat::ChatMessage;
use crate::datetime::parse_server_time;

/// A message in a room's history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    /// Server-assigned id.
    pub id: i64,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Sender's user id.
    pub sender_id: i64,
    /// Sender's display name.
    #[serde(default)]
    pub sender_name: String,
    /// Timestamp as sent by the server.
    #[serde(default)]
    pub sent_at: String,
    /// Whether the recipient has read the message.
    #[serde(default)]
    pub is_read: bool,
}

impl HistoryMessage {
    /// Convert into a confirmed log entry.
    pub fn into_chat_message(self, room_id: i64, timezone: &str) -> ChatMessage {
        let sent_at = parse_server_time(&self.sent_at, timezone).unwrap_or_else(Utc::now);
        ChatMessage::confirmed(
            room_id,
            self.id,
            self.sender_id,
            self.sender_name,
            self.content,
            sent_at,
        )
    }
}

/// Body of `GET /chat/unread-count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    /// Total unread messages over all rooms.
    #[serde(default)]
    pub unread_count: i64,
}

/// Error body returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
}
