//! Line-oriented terminal rendering of the chat screen.

use std::io::{self, Write};

use crate::chat::{
    ChatMessage, ChatView, LogChange, Origin, ReconciliationLog, RoomDirectory, StatusListener,
    StatusUpdate,
};
use crate::datetime::{format_date, format_time};

/// Replace control characters so server text cannot move the cursor.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Format one log entry.
pub fn format_entry(entry: &ChatMessage, timezone: &str) -> String {
    let time = format_time(&entry.sent_at, timezone);
    let content = sanitize(&entry.content);
    match entry.origin {
        Origin::System => format!("[{time}] *** {content}"),
        Origin::ServerConfirmed => {
            format!("[{time}] <{}> {content}", sanitize(&entry.sender_name))
        }
        Origin::LocalPending => {
            format!("[{time}] <{}> {content} (sending...)", sanitize(&entry.sender_name))
        }
        Origin::Expired => {
            format!("[{time}] <{}> {content} (not delivered)", sanitize(&entry.sender_name))
        }
    }
}

/// Format a connection status line.
pub fn format_status(update: &StatusUpdate) -> String {
    format!("*** {} [{}]", update.reason, update.state)
}

/// Status listener printing to standard output.
pub fn status_listener() -> StatusListener {
    Box::new(|update| println!("{}", format_status(update)))
}

/// Format the room list.
pub fn format_rooms(directory: &RoomDirectory, timezone: &str) -> Vec<String> {
    let mut lines = vec![
        "=== Chat Rooms ===".to_string(),
        format!("  {:<6} {:<24} {:<8} {:<10} {}", "ID", "Partner", "Role", "Last", "Unread"),
        "-".repeat(60),
    ];

    if directory.rooms().is_empty() {
        lines.push("No chat rooms yet. Rooms appear once a mentor request is accepted.".to_string());
        return lines;
    }

    let role = directory.role();
    for room in directory.rooms() {
        let last = room
            .last_activity(timezone)
            .map(|dt| format_date(&dt, timezone))
            .unwrap_or_else(|| "-".to_string());
        let unread = if room.unread_count > 0 {
            room.unread_count.to_string()
        } else {
            String::new()
        };
        lines.push(format!(
            "  {:<6} {:<24} {:<8} {:<10} {}",
            room.id,
            sanitize(room.partner_name(role)),
            room.partner_role(role),
            last,
            unread
        ));
    }
    lines
}

/// Chat view writing plain lines to a terminal.
pub struct TerminalView<W: Write> {
    out: W,
    timezone: String,
}

impl TerminalView<io::Stdout> {
    /// View on standard output.
    pub fn stdout(timezone: &str) -> Self {
        Self::new(io::stdout(), timezone)
    }
}

impl<W: Write> TerminalView<W> {
    /// Create a view writing to `out`.
    pub fn new(out: W, timezone: &str) -> Self {
        Self {
            out,
            timezone: timezone.to_string(),
        }
    }

    /// Print an informational line.
    pub fn notice(&mut self, text: &str) {
        self.line(&format!("*** {text}"));
    }

    /// Print text as-is.
    pub fn print(&mut self, text: &str) {
        self.line(text);
    }

    /// Consume the view and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::debug!("Failed to write to terminal: {}", e);
        }
    }

    fn entry(&mut self, log: &ReconciliationLog, index: usize) {
        if let Some(entry) = log.get(index) {
            let line = format_entry(entry, &self.timezone);
            self.line(&line);
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn show_rooms(&mut self, directory: &RoomDirectory) {
        for line in format_rooms(directory, &self.timezone) {
            self.line(&line);
        }
    }

    fn show_change(&mut self, log: &ReconciliationLog, change: &LogChange) {
        match change {
            LogChange::Reset => {
                if log.is_empty() {
                    self.line("No messages yet. Start the conversation!");
                    return;
                }
                let mut current_date = String::new();
                for index in 0..log.len() {
                    if let Some(entry) = log.get(index) {
                        let date = format_date(&entry.sent_at, &self.timezone);
                        if date != current_date {
                            self.line(&format!("--- {date} ---"));
                            current_date = date;
                        }
                    }
                    self.entry(log, index);
                }
            }
            LogChange::Appended(index) | LogChange::Replaced(index) => self.entry(log, *index),
            LogChange::Updated(indices) => {
                for index in indices {
                    self.entry(log, *index);
                }
            }
            LogChange::Cleared | LogChange::Unchanged => {}
        }
    }

    fn show_room_opened(&mut self, room_id: i64, title: &str) {
        self.line("");
        self.line(&format!("=== {} (room {room_id}) ===", sanitize(title)));
    }

    fn show_unread_total(&mut self, total: i64) {
        if total > 0 {
            self.line(&format!("*** {total} unread message(s)"));
        }
    }

    fn show_error(&mut self, message: &str) {
        self.line(&format!("!!! {message}"));
    }
}
