//! REST API client.
//!
//! Session-cookie-authenticated JSON endpoints for the current user, the
//! room list, room history, mark-as-read and the unread count.

mod client;
mod types;

pub use client::ApiClient;
pub use types::{HistoryMessage, UnreadCount};
