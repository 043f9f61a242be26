//! Test helpers for integration tests.
//!
//! Provides an in-process fake of the mentoring backend: the REST endpoints
//! under `/AlumniMentoring/resources` and the chat WebSocket endpoint under
//! `/AlumniMentoring/chat/{roomId}/{userId}`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};

use mentorchat::Config;

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Session cookie the fake backend accepts.
pub const SESSION_COOKIE: &str = "test-session";

/// Signed-in user of the fake backend.
pub const USER_ID: i64 = 10;
/// Room with history.
pub const ROOM_ID: i64 = 7;
/// Second room, empty.
pub const OTHER_ROOM_ID: i64 = 8;

const SERVER_TIME: &str = "2024-03-01T10:00:00";

/// Mutable state of the fake backend.
#[derive(Debug, Default)]
pub struct BackendState {
    /// History per room; rooms missing here answer 404.
    pub history: HashMap<i64, Vec<Value>>,
    /// Id assigned to the next message received over a socket.
    pub next_id: i64,
    /// Whether echoes carry the client's correlation id.
    pub echo_client_id: bool,
    /// Answer history requests with 500.
    pub fail_history: bool,
    /// Query strings of history requests.
    pub history_queries: Vec<HashMap<String, String>>,
    /// Rooms marked read.
    pub marked_read: Vec<i64>,
    /// Frames received per (room, user).
    pub received: Vec<(i64, i64, Value)>,
    /// Sockets accepted so far.
    pub connections: usize,
    /// Sockets currently open.
    pub open_connections: usize,
}

/// Shared backend state.
pub type SharedState = Arc<Mutex<BackendState>>;

/// Running fake backend.
pub struct FakeBackend {
    /// Listen address.
    pub addr: SocketAddr,
    /// Backend state.
    pub state: SharedState,
}

impl FakeBackend {
    /// Start a backend on an ephemeral port.
    pub async fn start() -> Self {
        let mut state = BackendState {
            next_id: 99,
            echo_client_id: true,
            ..Default::default()
        };
        state.history.insert(
            ROOM_ID,
            vec![
                history_message(1, 20, "Sipho Dlamini", "Welcome to mentoring!"),
                history_message(2, USER_ID, "Lerato Mokoena", "Thank you!"),
            ],
        );
        state.history.insert(OTHER_ROOM_ID, Vec::new());
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/AlumniMentoring/resources/auth/current-user", get(current_user))
            .route("/AlumniMentoring/resources/chat/rooms", get(chat_rooms))
            .route(
                "/AlumniMentoring/resources/chat/rooms/:id/messages",
                get(chat_messages),
            )
            .route(
                "/AlumniMentoring/resources/chat/rooms/:id/mark-read",
                post(mark_read),
            )
            .route("/AlumniMentoring/resources/chat/unread-count", get(unread_count))
            .route("/AlumniMentoring/chat/:room/:user", get(chat_socket))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to get local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    /// Client configuration pointing at this backend.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.server.base_url = format!("http://{}/AlumniMentoring", self.addr);
        config.server.timezone = "UTC".to_string();
        config.server.connect_timeout_secs = 2;
        config.server.request_timeout_secs = 5;
        config.session.cookie = SESSION_COOKIE.to_string();
        config
    }

    /// Lock the state.
    pub fn state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    /// Wait until `check` holds for the backend state.
    pub async fn wait_for(&self, check: impl Fn(&BackendState) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if check(&*self.state()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

/// A history entry as the backend serializes it.
pub fn history_message(id: i64, sender_id: i64, sender_name: &str, content: &str) -> Value {
    json!({
        "id": id,
        "chatRoomId": ROOM_ID,
        "content": content,
        "senderId": sender_id,
        "senderName": sender_name,
        "senderRole": if sender_id == USER_ID { "STUDENT" } else { "ALUMNI" },
        "messageType": "TEXT",
        "sentAt": SERVER_TIME,
        "isRead": true
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("JSESSIONID={SESSION_COOKIE}");
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(';').any(|c| c.trim() == expected))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Not authenticated" })),
    )
        .into_response()
}

async fn current_user(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "id": USER_ID,
        "email": "lerato@example.org",
        "fullName": "Lerato Mokoena",
        "role": "STUDENT"
    }))
    .into_response()
}

async fn chat_rooms(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {
            "id": ROOM_ID,
            "roomName": "Lerato & Sipho",
            "studentId": USER_ID,
            "studentName": "Lerato Mokoena",
            "alumniId": 20,
            "alumniName": "Sipho Dlamini",
            "createdAt": "2024-02-01T08:00:00",
            "lastMessageAt": SERVER_TIME,
            "isActive": true,
            "unreadCount": 2
        },
        {
            "id": OTHER_ROOM_ID,
            "roomName": "Lerato & Thandi",
            "studentId": USER_ID,
            "studentName": "Lerato Mokoena",
            "alumniId": 21,
            "alumniName": "",
            "createdAt": "2024-02-02T08:00:00",
            "lastMessageAt": "",
            "isActive": true,
            "unreadCount": 0
        }
    ]))
    .into_response()
}

async fn chat_messages(
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
    State(state): State<SharedState>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state.history_queries.push(query);
    if state.fail_history {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Database unavailable" })),
        )
            .into_response();
    }
    match state.history.get(&room_id) {
        Some(messages) => Json(Value::Array(messages.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Chat room not found" })),
        )
            .into_response(),
    }
}

async fn mark_read(
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    State(state): State<SharedState>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().marked_read.push(room_id);
    Json(json!({ "success": true })).into_response()
}

async fn unread_count(headers: HeaderMap, State(state): State<SharedState>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let count = if state.lock().unwrap().marked_read.contains(&ROOM_ID) {
        0
    } else {
        2
    };
    Json(json!({ "unreadCount": count })).into_response()
}

async fn chat_socket(
    ws: WebSocketUpgrade,
    Path((room_id, user_id)): Path<(i64, i64)>,
    State(state): State<SharedState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, user_id, state))
}

/// Mirror the backend's chat endpoint: a join notice, then one echo per text frame.
async fn handle_socket(socket: WebSocket, room_id: i64, user_id: i64, state: SharedState) {
    {
        let mut state = state.lock().unwrap();
        state.connections += 1;
        state.open_connections += 1;
    }
    let (mut sender, mut receiver) = socket.split();

    let joined = json!({
        "type": "system",
        "content": format!("User {user_id} joined the chat"),
        "sentAt": SERVER_TIME
    });
    if sender.send(Message::Text(joined.to_string())).await.is_ok() {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                continue;
            };

            let echo = {
                let mut state = state.lock().unwrap();
                state.received.push((room_id, user_id, frame.clone()));
                let id = state.next_id;
                state.next_id += 1;
                let mut echo = json!({
                    "type": "message",
                    "id": id,
                    "content": frame["content"],
                    "senderId": user_id,
                    "senderName": "Lerato Mokoena",
                    "senderRole": "STUDENT",
                    "messageType": "TEXT",
                    "sentAt": SERVER_TIME,
                    "isRead": false
                });
                if state.echo_client_id {
                    if let Some(client_id) = frame.get("clientId") {
                        echo["clientId"] = client_id.clone();
                    }
                }
                echo
            };

            if sender.send(Message::Text(echo.to_string())).await.is_err() {
                break;
            }
        }
    }

    state.lock().unwrap().open_connections -= 1;
}
