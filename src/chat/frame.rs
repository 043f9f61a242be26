//! WebSocket frame types for chat communication.
//!
//! One JSON object per frame. Outbound frames carry the text and an optional
//! correlation id; inbound frames are either a system notice or a chat message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::message::PendingToken;

/// Frame type the server expects for text messages.
const TEXT_FRAME_TYPE: &str = "TEXT";

/// Errors decoding an inbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Not a JSON object of the expected shape.
    #[error("malformed frame: {0}")]
    Malformed(String),
    /// Unknown `type` tag.
    #[error("unknown frame type: {0}")]
    UnknownType(String),
    /// A required field is absent.
    #[error("missing field in {frame_type} frame: {field}")]
    MissingField {
        /// Frame type tag.
        frame_type: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },
}

/// Frame sent from client to server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    /// Message content.
    pub content: String,
    /// Frame type, always "TEXT".
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    /// Correlation id the server may echo back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl OutboundFrame {
    /// Create a text frame.
    pub fn text(content: impl Into<String>, correlation: Option<&PendingToken>) -> Self {
        Self {
            content: content.into(),
            frame_type: TEXT_FRAME_TYPE,
            client_id: correlation.map(ToString::to_string),
        }
    }

    /// Encode as JSON.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Wire shape of every inbound frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInboundFrame {
    #[serde(rename = "type")]
    frame_type: String,
    content: Option<String>,
    id: Option<i64>,
    sender_id: Option<i64>,
    sender_name: Option<String>,
    sent_at: Option<String>,
    client_id: Option<String>,
}

/// A chat message carried by an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Server-assigned id.
    pub id: i64,
    /// Sender's user id.
    pub sender_id: i64,
    /// Sender's display name.
    pub sender_name: String,
    /// Message content.
    pub content: String,
    /// Raw timestamp as sent by the server.
    pub sent_at: Option<String>,
    /// Echoed correlation id.
    pub client_id: Option<String>,
}

/// Frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Non-attributable notice (join/leave and the like).
    System {
        /// Notice text.
        content: String,
        /// Raw timestamp as sent by the server.
        sent_at: Option<String>,
    },
    /// Chat message.
    Message(InboundMessage),
}

impl InboundFrame {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let raw: RawInboundFrame =
            serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;

        match raw.frame_type.as_str() {
            "system" => Ok(InboundFrame::System {
                content: raw.content.unwrap_or_default(),
                sent_at: raw.sent_at,
            }),
            "message" => {
                let id = raw.id.ok_or(FrameError::MissingField {
                    frame_type: "message",
                    field: "id",
                })?;
                let sender_id = raw.sender_id.ok_or(FrameError::MissingField {
                    frame_type: "message",
                    field: "senderId",
                })?;
                Ok(InboundFrame::Message(InboundMessage {
                    id,
                    sender_id,
                    sender_name: raw.sender_name.unwrap_or_default(),
                    content: raw.content.unwrap_or_default(),
                    sent_at: raw.sent_at,
                    client_id: raw.client_id,
                }))
            }
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}
