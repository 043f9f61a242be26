//! mentorchat - terminal chat client for the alumni mentoring platform.
//!
//! Students and alumni exchange messages in per-mentorship chat rooms. The
//! client loads rooms and history over the REST API and holds one WebSocket
//! connection to the room being viewed.

pub mod api;
pub mod chat;
pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod render;

pub use api::ApiClient;
pub use chat::{ChatController, ChatView, SessionState, WsConnector};
pub use config::Config;
pub use error::{ChatError, Result};
pub use render::TerminalView;
