//! Chat input parser.
//!
//! A line starting with `/` is a client command; anything else is message
//! text for the open room.

/// Result of parsing an input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Message text.
    Message(String),
    /// Parsed command.
    Command(ChatCommand),
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// List chat rooms.
    Rooms,
    /// Open a chat room by id.
    Open(i64),
    /// Close the open room's connection.
    Close,
    /// Show help message.
    Help,
    /// Exit the client.
    Quit,
    /// Command with a missing or bad argument.
    Invalid(String),
    /// Unknown command.
    Unknown(String),
}

impl ChatCommand {
    /// Get the command name.
    pub fn name(&self) -> &str {
        match self {
            ChatCommand::Rooms => "rooms",
            ChatCommand::Open(_) => "open",
            ChatCommand::Close => "close",
            ChatCommand::Help => "help",
            ChatCommand::Quit => "quit",
            ChatCommand::Invalid(cmd) | ChatCommand::Unknown(cmd) => cmd,
        }
    }
}

impl std::fmt::Display for ChatCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatCommand::Open(id) => write!(f, "/open {id}"),
            other => write!(f, "/{}", other.name()),
        }
    }
}

/// Parse an input line into a message or command.
pub fn parse_input(input: &str) -> ChatInput {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return ChatInput::Message(trimmed.to_string());
    }

    let without_slash = &trimmed[1..];
    let (cmd, args) = match without_slash.find(' ') {
        Some(pos) => (&without_slash[..pos], without_slash[pos + 1..].trim()),
        None => (without_slash, ""),
    };

    let command = match cmd.to_lowercase().as_str() {
        "rooms" | "r" | "list" => ChatCommand::Rooms,
        "open" | "o" | "join" => match args.parse::<i64>() {
            Ok(id) => ChatCommand::Open(id),
            Err(_) => ChatCommand::Invalid(cmd.to_string()),
        },
        "close" | "leave" => ChatCommand::Close,
        "help" | "h" | "?" => ChatCommand::Help,
        "quit" | "q" | "exit" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(cmd.to_string()),
    };

    ChatInput::Command(command)
}

/// Command information for help display.
pub struct CommandInfo {
    /// Command syntax.
    pub syntax: &'static str,
    /// Command aliases.
    pub aliases: &'static [&'static str],
    /// Command description.
    pub description: &'static str,
}

/// Get all available command information.
pub fn get_command_help() -> Vec<CommandInfo> {
    vec![
        CommandInfo {
            syntax: "/rooms",
            aliases: &["r", "list"],
            description: "List your chat rooms",
        },
        CommandInfo {
            syntax: "/open <room id>",
            aliases: &["o", "join"],
            description: "Open a chat room and connect to it",
        },
        CommandInfo {
            syntax: "/close",
            aliases: &["leave"],
            description: "Disconnect from the open chat room",
        },
        CommandInfo {
            syntax: "/help",
            aliases: &["h", "?"],
            description: "Show this help",
        },
        CommandInfo {
            syntax: "/quit",
            aliases: &["q", "exit"],
            description: "Exit",
        },
    ]
}

/// Format the help message for display.
pub fn format_help() -> String {
    let mut lines = vec!["=== Commands ===".to_string()];

    for info in get_command_help() {
        lines.push(format!("{:<18} {}", info.syntax, info.description));
        if !info.aliases.is_empty() {
            lines.push(format!("{:<18} aliases: /{}", "", info.aliases.join(", /")));
        }
    }
    lines.push("Anything else is sent to the open room.".to_string());

    lines.join("\n")
}
