use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use mentorchat::chat::{format_help, parse_input, ChatCommand, ChatInput};
use mentorchat::render::status_listener;
use mentorchat::{ApiClient, ChatController, Config, TerminalView, WsConnector};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = mentorchat::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mentorchat::logging::init_console_only(&config.logging.level);
    }

    info!("mentorchat starting against {}", config.server.base_url);
    if config.session.cookie.is_empty() {
        eprintln!("No session cookie configured; set MENTORCHAT_SESSION_COOKIE to sign in.");
    }

    if let Err(e) = run(config).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> mentorchat::Result<()> {
    let api = ApiClient::new(&config)?;
    let view = TerminalView::stdout(&config.server.timezone);
    let (mut controller, mut events) =
        ChatController::new(&config, api, Arc::new(WsConnector::new()), view)?;
    controller.on_status(status_listener());

    controller.load().await;

    if let Some(room_id) = std::env::args().nth(1).and_then(|arg| arg.parse::<i64>().ok()) {
        controller.select_room(room_id).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sweep = tokio::time::interval(Duration::from_secs(config.chat.sweep_interval_secs));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    ChatInput::Message(text) if text.is_empty() => {}
                    ChatInput::Message(text) => {
                        if controller.active_room().is_none() {
                            println!("*** Open a room first (/rooms, /open <room id>)");
                        } else if !controller.send_message(&text) {
                            println!("*** Not connected; message not sent");
                        }
                    }
                    ChatInput::Command(ChatCommand::Rooms) => controller.refresh_rooms().await,
                    ChatInput::Command(ChatCommand::Open(room_id)) => {
                        controller.select_room(room_id).await;
                    }
                    ChatInput::Command(ChatCommand::Close) => controller.close(),
                    ChatInput::Command(ChatCommand::Help) => println!("{}", format_help()),
                    ChatInput::Command(ChatCommand::Quit) => break,
                    ChatInput::Command(ChatCommand::Invalid(cmd)) => {
                        println!("*** Usage error: /{cmd}; see /help");
                    }
                    ChatInput::Command(ChatCommand::Unknown(cmd)) => {
                        println!("*** Unknown command: /{cmd}");
                    }
                }
            }

            Some(event) = events.recv() => controller.handle_transport_event(event),

            _ = sweep.tick() => controller.sweep_pending(),
        }
    }

    controller.close();
    info!("mentorchat exiting");
    Ok(())
}
