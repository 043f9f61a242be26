//! Chat client core.
//!
//! This module provides:
//! - The room directory and partner naming
//! - The session manager owning the single real-time transport
//! - The reconciliation log merging optimistic and confirmed messages
//! - The controller driving the chat screen
//! - Input commands (/rooms, /open, /close, /help, /quit)

mod command;
mod controller;
mod frame;
mod log;
mod message;
mod room;
mod session;
mod transport;

pub use command::{format_help, get_command_help, parse_input, ChatCommand, ChatInput, CommandInfo};
pub use controller::{ChatController, ChatView, HistoryTicket};
pub use frame::{FrameError, InboundFrame, InboundMessage, OutboundFrame};
pub use log::{LogChange, ReconciliationLog};
pub use message::{ChatMessage, MessageId, Origin, PendingToken};
pub use room::{CurrentUser, Role, Room, RoomDirectory};
pub use session::{
    Connector, SessionManager, SessionState, StatusListener, StatusUpdate, TransportEvent,
    TransportEventKind, TransportLink,
};
pub use transport::WsConnector;
