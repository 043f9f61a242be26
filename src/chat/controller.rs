//! Chat screen controller.
//!
//! Ties the room directory, the REST client, the session manager and the
//! reconciliation log together and reports every visible change to a
//! [`ChatView`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use super::frame::InboundFrame;
use super::log::{LogChange, ReconciliationLog};
use super::message::ChatMessage;
use super::room::RoomDirectory;
use super::session::{Connector, SessionManager, SessionState, StatusListener, TransportEvent};
use crate::api::{ApiClient, HistoryMessage};
use crate::config::Config;
use crate::datetime::parse_server_time;
use crate::Result;

/// Render sink for the chat screen.
pub trait ChatView {
    /// The room list changed.
    fn show_rooms(&mut self, directory: &RoomDirectory);
    /// The log changed; `change` names the affected entries.
    fn show_change(&mut self, log: &ReconciliationLog, change: &LogChange);
    /// A room was opened.
    fn show_room_opened(&mut self, room_id: i64, title: &str);
    /// Total unread count across rooms.
    fn show_unread_total(&mut self, total: i64);
    /// Inline error notice in place of content.
    fn show_error(&mut self, message: &str);
}

/// Identifies one history load; results of superseded loads are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTicket {
    epoch: u64,
    room_id: i64,
}

impl HistoryTicket {
    /// Room the load is for.
    pub fn room_id(&self) -> i64 {
        self.room_id
    }
}

/// Chat screen state.
pub struct ChatController<V: ChatView> {
    api: ApiClient,
    directory: RoomDirectory,
    session: SessionManager,
    log: ReconciliationLog,
    view: V,
    timezone: String,
    history_limit: u32,
    pending_ttl: Duration,
    epoch: u64,
}

impl<V: ChatView> ChatController<V> {
    /// Create a controller.
    ///
    /// Returns the controller and the transport event receiver to feed into
    /// [`ChatController::handle_transport_event`].
    pub fn new(
        config: &Config,
        api: ApiClient,
        connector: Arc<dyn Connector>,
        view: V,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        let (session, events) = SessionManager::new(connector, config.ws_base()?);
        let pending_secs = config
            .chat
            .pending_timeout_secs
            .min(crate::config::MAX_PENDING_TIMEOUT_SECS) as i64;
        let controller = Self {
            api,
            directory: RoomDirectory::new(),
            session,
            log: ReconciliationLog::new(),
            view,
            timezone: config.server.timezone.clone(),
            history_limit: config.chat.history_limit,
            pending_ttl: Duration::seconds(pending_secs),
            epoch: 0,
        };
        Ok((controller, events))
    }

    /// Install the connection status listener.
    pub fn on_status(&mut self, listener: StatusListener) {
        self.session.on_status(listener);
    }

    /// Room directory.
    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Log of the open room.
    pub fn log(&self) -> &ReconciliationLog {
        &self.log
    }

    /// Session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Room of the live transport.
    pub fn active_room(&self) -> Option<i64> {
        self.session.active_room()
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Load the signed-in user and the room list.
    pub async fn load(&mut self) {
        match self.api.current_user().await {
            Ok(user) => {
                tracing::info!("Signed in as {} ({})", user.display_name(), user.id);
                self.log.set_self_id(Some(user.id));
                self.directory.set_user(Some(user));
            }
            Err(e) => {
                tracing::warn!("Failed to load current user: {}", e);
                self.view.show_error("Failed to load user information");
            }
        }

        self.refresh_rooms().await;
        self.refresh_unread_total().await;
    }

    /// Re-fetch the room list.
    pub async fn refresh_rooms(&mut self) {
        match self.api.chat_rooms().await {
            Ok(rooms) => {
                if rooms.is_empty() {
                    tracing::info!(
                        "No chat rooms; rooms are created when mentor requests are accepted"
                    );
                }
                self.directory.replace_rooms(rooms);
            }
            Err(e) => {
                tracing::warn!("Failed to load chat rooms: {}", e);
                self.directory.replace_rooms(Vec::new());
                self.view.show_error("Failed to load chat rooms");
            }
        }
        self.view.show_rooms(&self.directory);
    }

    /// Open a room: history first, then the transport.
    pub async fn select_room(&mut self, room_id: i64) {
        let Some(title) = self.directory.partner_name(room_id).map(str::to_string) else {
            self.view.show_error(&format!("Chat room {room_id} not found"));
            return;
        };

        self.session.close();
        let change = self.log.clear();
        self.view.show_change(&self.log, &change);
        self.view.show_room_opened(room_id, &title);

        let ticket = self.begin_history_load(room_id);
        self.mark_read(room_id).await;

        let history = self.api.chat_messages(room_id, self.history_limit, 0).await;
        if self.apply_history(ticket, history) {
            self.session.open(room_id, self.directory.user_id());
        }
    }

    /// Start a history load, superseding any earlier one.
    pub fn begin_history_load(&mut self, room_id: i64) -> HistoryTicket {
        self.epoch += 1;
        HistoryTicket {
            epoch: self.epoch,
            room_id,
        }
    }

    /// Apply the result of a history load.
    ///
    /// Returns true if the history was applied. Results of superseded loads
    /// are dropped; failures are shown inline.
    pub fn apply_history(
        &mut self,
        ticket: HistoryTicket,
        history: Result<Vec<HistoryMessage>>,
    ) -> bool {
        if ticket.epoch != self.epoch {
            tracing::debug!("Discarding stale history for room {}", ticket.room_id);
            return false;
        }

        match history {
            Ok(messages) => {
                let entries = messages
                    .into_iter()
                    .map(|m| m.into_chat_message(ticket.room_id, &self.timezone))
                    .collect();
                let change = self.log.replace_all(ticket.room_id, entries);
                self.view.show_change(&self.log, &change);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load messages for room {}: {}", ticket.room_id, e);
                self.view.show_error("Failed to load messages. Please try again.");
                false
            }
        }
    }

    /// Send text to the open room.
    ///
    /// Returns false (without touching the log) unless connected.
    pub fn send_message(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if self.session.state() != SessionState::Connected {
            tracing::debug!("Not connected; message not sent");
            return false;
        }
        let Some(user) = self.directory.current_user() else {
            return false;
        };
        let (self_id, self_name) = (user.id, user.display_name().to_string());

        let (token, change) = match self.log.append_optimistic(text, self_id, &self_name) {
            Ok(appended) => appended,
            Err(e) => {
                tracing::warn!("Cannot send: {}", e);
                return false;
            }
        };
        self.view.show_change(&self.log, &change);
        self.session.send(text, Some(&token))
    }

    /// Apply an event from the transport.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(frame) = self.session.handle_event(event) else {
            return;
        };
        let Some(room_id) = self.log.room_id() else {
            tracing::debug!("Frame received with no room open");
            return;
        };

        let change = match frame {
            InboundFrame::System { content, sent_at } => {
                let sent_at = sent_at
                    .as_deref()
                    .and_then(|s| parse_server_time(s, &self.timezone))
                    .unwrap_or_else(Utc::now);
                self.log.append_system(&content, sent_at)
            }
            InboundFrame::Message(inbound) => self
                .log
                .reconcile_inbound(ChatMessage::from_inbound(room_id, inbound, &self.timezone)),
        };
        if change != LogChange::Unchanged {
            self.view.show_change(&self.log, &change);
        }
    }

    /// Mark placeholders that were never confirmed.
    pub fn sweep_pending(&mut self) {
        let change = self.log.expire_pending(Utc::now(), self.pending_ttl);
        if change != LogChange::Unchanged {
            self.view.show_change(&self.log, &change);
        }
    }

    /// Disconnect from the open room.
    pub fn close(&mut self) {
        self.session.close();
    }

    async fn mark_read(&mut self, room_id: i64) {
        match self.api.mark_read(room_id).await {
            Ok(()) => {
                if self.directory.mark_read(room_id) {
                    self.view.show_rooms(&self.directory);
                }
                self.refresh_unread_total().await;
            }
            Err(e) => tracing::warn!("Failed to mark room {} as read: {}", room_id, e),
        }
    }

    async fn refresh_unread_total(&mut self) {
        match self.api.unread_count().await {
            Ok(total) => self.view.show_unread_total(total),
            Err(e) => tracing::warn!("Failed to update unread count: {}", e),
        }
    }
}
