//! Chat message model.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::frame::InboundMessage;
use crate::datetime::parse_server_time;

/// Prefix of placeholder ids, kept compatible with the web client.
const PENDING_PREFIX: &str = "temp_";

/// Locally generated token identifying an optimistic message.
///
/// The token doubles as the correlation id sent in the outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingToken(Uuid);

impl PendingToken {
    /// Generate a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a token from its wire form (`temp_<uuid>`).
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix(PENDING_PREFIX)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(Self)
    }
}

impl Default for PendingToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PendingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PENDING_PREFIX}{}", self.0)
    }
}

/// Message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Id assigned by the server.
    Server(i64),
    /// Placeholder awaiting confirmation.
    Pending(PendingToken),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Server(id) => write!(f, "{id}"),
            MessageId::Pending(token) => write!(f, "{token}"),
        }
    }
}

/// Where a log entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Sent by this client, not yet echoed by the server.
    LocalPending,
    /// Sent by this client and never echoed within the pending timeout.
    Expired,
    /// Confirmed by the server.
    ServerConfirmed,
    /// Non-attributable notice from the server.
    System,
}

impl Origin {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::LocalPending => "pending",
            Origin::Expired => "expired",
            Origin::ServerConfirmed => "confirmed",
            Origin::System => "system",
        }
    }

    /// Whether the entry is an unconfirmed local placeholder.
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, Origin::LocalPending | Origin::Expired)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chat message as held in the reconciliation log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Message id (None for system notices).
    pub id: Option<MessageId>,
    /// Room the message belongs to.
    pub room_id: i64,
    /// Sender's user id (None for system notices).
    pub sender_id: Option<i64>,
    /// Sender's display name (empty for system notices).
    pub sender_name: String,
    /// Body text.
    pub content: String,
    /// Time the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Origin of the entry.
    pub origin: Origin,
    /// Correlation token (own for placeholders, echoed for confirmations).
    pub correlation: Option<PendingToken>,
}

impl ChatMessage {
    /// Create an optimistic placeholder.
    pub fn pending(
        room_id: i64,
        token: PendingToken,
        sender_id: i64,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(MessageId::Pending(token)),
            room_id,
            sender_id: Some(sender_id),
            sender_name: sender_name.into(),
            content: content.into(),
            sent_at: Utc::now(),
            origin: Origin::LocalPending,
            correlation: Some(token),
        }
    }

    /// Create a server-confirmed message.
    pub fn confirmed(
        room_id: i64,
        id: i64,
        sender_id: i64,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(MessageId::Server(id)),
            room_id,
            sender_id: Some(sender_id),
            sender_name: sender_name.into(),
            content: content.into(),
            sent_at,
            origin: Origin::ServerConfirmed,
            correlation: None,
        }
    }

    /// Create a system notice.
    pub fn system(room_id: i64, content: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            room_id,
            sender_id: None,
            sender_name: String::new(),
            content: content.into(),
            sent_at,
            origin: Origin::System,
            correlation: None,
        }
    }

    /// Build a confirmed message from an inbound frame.
    ///
    /// Unparseable or missing timestamps fall back to the receive time.
    pub fn from_inbound(room_id: i64, inbound: InboundMessage, timezone: &str) -> Self {
        let sent_at = inbound
            .sent_at
            .as_deref()
            .and_then(|s| parse_server_time(s, timezone))
            .unwrap_or_else(Utc::now);
        let mut message = Self::confirmed(
            room_id,
            inbound.id,
            inbound.sender_id,
            inbound.sender_name,
            inbound.content,
            sent_at,
        );
        message.correlation = inbound.client_id.as_deref().and_then(PendingToken::parse);
        message
    }

    /// Attach an echoed correlation token.
    pub fn with_correlation(mut self, token: PendingToken) -> Self {
        self.correlation = Some(token);
        self
    }

    /// Server id, if confirmed.
    pub fn server_id(&self) -> Option<i64> {
        match self.id {
            Some(MessageId::Server(id)) => Some(id),
            _ => None,
        }
    }

    /// Whether this entry was sent by the given user.
    pub fn is_from(&self, user_id: i64) -> bool {
        self.sender_id == Some(user_id)
    }
}
