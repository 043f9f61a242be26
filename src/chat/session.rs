//! Chat session manager.
//!
//! Owns the single real-time transport of the client. A transport is bound
//! to one `(room, user)` pair; opening another room always releases the
//! previous transport first. Transport I/O runs in its own task and reports
//! back through generation-tagged [`TransportEvent`]s, so events from a
//! transport that has already been released are recognised and dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use url::Url;

use super::frame::{InboundFrame, OutboundFrame};
use super::message::PendingToken;

/// Connection state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport has been opened yet.
    Idle,
    /// Transport requested, not ready.
    Connecting,
    /// Transport ready; sending is allowed.
    Connected,
    /// Transport closed or failed. A new `open` is required.
    Disconnected,
}

impl SessionState {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A state transition reported to the status listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New state.
    pub state: SessionState,
    /// Human-readable reason.
    pub reason: String,
}

/// Callback invoked on every state transition.
pub type StatusListener = Box<dyn FnMut(&StatusUpdate) + Send>;

/// What happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Handshake completed.
    Ready,
    /// Text frame received.
    Frame(String),
    /// Closed by the server or the network.
    Closed(String),
    /// Connect or I/O failure.
    Failed(String),
}

/// Event reported by a transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Generation of the transport that produced the event.
    pub generation: u64,
    /// Event payload.
    pub kind: TransportEventKind,
}

/// Channels handed to a connector for one transport.
///
/// The transport must stop once `shutdown` resolves or `outbound` closes.
#[derive(Debug)]
pub struct TransportLink {
    /// Generation to tag events with.
    pub generation: u64,
    /// Encoded frames to send.
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Resolves when the session releases the transport.
    pub shutdown: oneshot::Receiver<()>,
    /// Event sink back to the session.
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportLink {
    /// Report an event for this link's generation.
    ///
    /// Returns false if the session has gone away.
    pub fn emit(&self, kind: TransportEventKind) -> bool {
        self.events
            .send(TransportEvent {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }
}

/// Establishes transports.
pub trait Connector: Send + Sync {
    /// Start a transport to `target`. Must not block; progress is reported
    /// through the link.
    fn connect(&self, target: Url, link: TransportLink);
}

/// The live transport and what it is bound to.
struct ActiveTransport {
    room_id: i64,
    user_id: i64,
    generation: u64,
    outbound: mpsc::UnboundedSender<String>,
    // Dropping this sender resolves the transport's shutdown receiver.
    _shutdown: oneshot::Sender<()>,
}

/// Manages at most one live transport.
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    ws_base: Url,
    state: SessionState,
    active: Option<ActiveTransport>,
    next_generation: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
    listener: Option<StatusListener>,
}

impl SessionManager {
    /// Create a session manager.
    ///
    /// Returns the manager and the receiver on which transport events
    /// arrive; feed them back through [`SessionManager::handle_event`].
    pub fn new(
        connector: Arc<dyn Connector>,
        ws_base: Url,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            connector,
            ws_base,
            state: SessionState::Idle,
            active: None,
            next_generation: 0,
            events,
            listener: None,
        };
        (manager, events_rx)
    }

    /// Install the status listener.
    pub fn on_status(&mut self, listener: StatusListener) {
        self.listener = Some(listener);
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Room of the live transport, if any.
    pub fn active_room(&self) -> Option<i64> {
        self.active.as_ref().map(|a| a.room_id)
    }

    /// User the live transport is bound to, if any.
    pub fn active_user(&self) -> Option<i64> {
        self.active.as_ref().map(|a| a.user_id)
    }

    /// Connection target for a room and user.
    pub fn target_for(&self, room_id: i64, user_id: i64) -> Option<Url> {
        let mut url = self.ws_base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&room_id.to_string())
            .push(&user_id.to_string());
        Some(url)
    }

    /// Open a transport for `room_id` as `user_id`.
    ///
    /// Any live transport is released first. Without a user id the session
    /// goes to `Disconnected` and nothing is opened.
    pub fn open(&mut self, room_id: i64, user_id: Option<i64>) {
        self.close();

        let Some(user_id) = user_id else {
            tracing::warn!("Cannot open chat room {}: no user id", room_id);
            self.transition(SessionState::Disconnected, "User not authenticated");
            return;
        };

        let Some(target) = self.target_for(room_id, user_id) else {
            tracing::warn!("Cannot build chat target from {}", self.ws_base);
            self.transition(SessionState::Disconnected, "Invalid chat address");
            return;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        self.active = Some(ActiveTransport {
            room_id,
            user_id,
            generation,
            outbound: outbound_tx,
            _shutdown: shutdown_tx,
        });
        self.transition(SessionState::Connecting, "Connecting...");

        tracing::info!(
            "Opening chat transport {} for room {} as user {}",
            generation,
            room_id,
            user_id
        );
        self.connector.connect(
            target,
            TransportLink {
                generation,
                outbound: outbound_rx,
                shutdown: shutdown_rx,
                events: self.events.clone(),
            },
        );
    }

    /// Send a text message.
    ///
    /// Only valid while connected; otherwise the message is dropped and
    /// `false` is returned.
    pub fn send(&mut self, content: &str, correlation: Option<&PendingToken>) -> bool {
        if self.state != SessionState::Connected {
            tracing::debug!("Dropping outbound message while {}", self.state);
            return false;
        }
        let Some(active) = self.active.as_ref() else {
            return false;
        };

        let json = match OutboundFrame::text(content, correlation).encode() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode outbound frame: {}", e);
                return false;
            }
        };

        if active.outbound.send(json).is_err() {
            tracing::debug!("Transport {} already gone", active.generation);
            return false;
        }
        true
    }

    /// Release the live transport. Safe to call at any time.
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(
                "Closing chat transport {} for room {}",
                active.generation,
                active.room_id
            );
            drop(active);
            self.transition(SessionState::Disconnected, "Disconnected");
        }
    }

    /// Apply an event reported by a transport.
    ///
    /// Returns the decoded frame for `Frame` events of the live transport.
    /// Events of released transports and undecodable frames yield `None`.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<InboundFrame> {
        let live = self
            .active
            .as_ref()
            .is_some_and(|a| a.generation == event.generation);
        if !live {
            tracing::debug!(
                "Ignoring event from released transport {}: {:?}",
                event.generation,
                event.kind
            );
            return None;
        }

        match event.kind {
            TransportEventKind::Ready => {
                if self.state == SessionState::Connecting {
                    self.transition(SessionState::Connected, "Connected");
                }
                None
            }
            TransportEventKind::Frame(text) => match InboundFrame::decode(&text) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::warn!("Dropping inbound frame: {}", e);
                    None
                }
            },
            TransportEventKind::Closed(reason) => {
                tracing::info!("Chat transport {} closed: {}", event.generation, reason);
                self.active = None;
                self.transition(SessionState::Disconnected, "Disconnected");
                None
            }
            TransportEventKind::Failed(error) => {
                tracing::warn!("Chat transport {} failed: {}", event.generation, error);
                self.active = None;
                self.transition(
                    SessionState::Disconnected,
                    &format!("Connection Error: {error}"),
                );
                None
            }
        }
    }

    fn transition(&mut self, state: SessionState, reason: &str) {
        self.state = state;
        let update = StatusUpdate {
            state,
            reason: reason.to_string(),
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(&update);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A connector that records links instead of connecting.

    use std::sync::Mutex;

    use super::*;

    /// Records every link handed to it.
    #[derive(Default)]
    pub struct RecordingConnector {
        links: Mutex<Vec<(Url, TransportLink)>>,
    }

    impl RecordingConnector {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Number of connect calls so far.
        pub fn connect_count(&self) -> usize {
            self.links.lock().unwrap().len()
        }

        /// Target of the n-th connect call.
        pub fn target(&self, n: usize) -> Url {
            self.links.lock().unwrap()[n].0.clone()
        }

        /// Whether the n-th transport has been released by the session.
        pub fn is_released(&self, n: usize) -> bool {
            let mut links = self.links.lock().unwrap();
            matches!(
                links[n].1.shutdown.try_recv(),
                Err(oneshot::error::TryRecvError::Closed)
            )
        }

        /// Number of transports not yet released.
        pub fn live_count(&self) -> usize {
            (0..self.connect_count())
                .filter(|&n| !self.is_released(n))
                .count()
        }

        /// Emit an event on the n-th link.
        pub fn emit(&self, n: usize, kind: TransportEventKind) {
            self.links.lock().unwrap()[n].1.emit(kind);
        }

        /// Drain frames sent on the n-th link.
        pub fn sent(&self, n: usize) -> Vec<String> {
            let mut links = self.links.lock().unwrap();
            let mut frames = Vec::new();
            while let Ok(frame) = links[n].1.outbound.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    impl Connector for RecordingConnector {
        fn connect(&self, target: Url, link: TransportLink) {
            self.links.lock().unwrap().push((target, link));
        }
    }
}
