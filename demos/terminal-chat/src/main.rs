use std::io::BufRead;

use clap::Parser;
use parley::prelude::*;
use tokio::sync::{mpsc, watch};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Terminal chat client.
#[derive(Parser, Debug)]
#[command(name = "terminal-chat")]
struct Args {
    /// Chat server endpoint.
    #[arg(long, env = "PARLEY_WS_URL", default_value = parley::DEFAULT_URL)]
    url: String,

    /// Username to start with (same as typing `/nick NAME`).
    #[arg(long, short)]
    username: Option<String>,

    /// Reconnect with backoff after the connection drops.
    #[arg(long)]
    reconnect: bool,

    /// Keep a room's messages when leaving and re-joining it.
    #[arg(long)]
    preserve_history: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Action(UserAction),
    Rooms,
    Dump,
    Help,
}

const HELP: &str = "\
commands:
  /nick NAME     set your username
  /create ROOM   create a room and switch to it
  /join ROOM     join a room
  /leave         leave the current room
  /rooms         list rooms
  /dump          print the session as JSON
  /quit          exit
anything else is sent to the current room";

/// Parses one input line. `Ok(None)` means there's nothing to do.
fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let Some(command) = line.strip_prefix('/') else {
        if line.trim().is_empty() {
            return Ok(None);
        }
        return Ok(Some(Input::Action(UserAction::SendMessage(line.to_string()))));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command.trim(), ""),
    };
    let needs_arg = |usage: &str| -> Result<String, String> {
        if arg.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(arg.to_string())
        }
    };

    let input = match name {
        "nick" => Input::Action(UserAction::SetUsername(needs_arg("/nick NAME")?)),
        "create" => Input::Action(UserAction::CreateRoom(needs_arg("/create ROOM")?)),
        "join" => Input::Action(UserAction::JoinRoom(needs_arg("/join ROOM")?)),
        "leave" => Input::Action(UserAction::LeaveRoom),
        "quit" | "exit" => Input::Action(UserAction::Quit),
        "rooms" => Input::Rooms,
        "dump" => Input::Dump,
        "help" => Input::Help,
        other => return Err(format!("unknown command /{other}, try /help")),
    };
    Ok(Some(input))
}

/// Reads stdin on a plain thread so a blocked read never holds up runtime
/// shutdown.
fn spawn_input(
    actions: mpsc::UnboundedSender<UserAction>,
    snapshot: watch::Receiver<SessionSnapshot>,
) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            match parse_input(&line) {
                Ok(Some(Input::Action(action))) => {
                    let quit = action == UserAction::Quit;
                    if actions.send(action).is_err() || quit {
                        return;
                    }
                }
                Ok(Some(Input::Rooms)) => print_rooms(&snapshot.borrow()),
                Ok(Some(Input::Dump)) => {
                    match serde_json::to_string_pretty(&*snapshot.borrow()) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("dump failed: {e}"),
                    }
                }
                Ok(Some(Input::Help)) => println!("{HELP}"),
                Ok(None) => {}
                Err(msg) => eprintln!("{msg}"),
            }
        }
        let _ = actions.send(UserAction::Quit);
    });
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_rooms(snapshot: &SessionSnapshot) {
    if snapshot.rooms.is_empty() {
        println!("(no rooms)");
    }
    for room in &snapshot.rooms {
        let marker = if snapshot.current_room.as_ref() == Some(room.name()) { '*' } else { ' ' };
        println!("{marker} {} ({} messages)", room.name(), room.messages().len());
    }
}

fn format_message(msg: &Message, own: bool) -> String {
    let who = if own { "you" } else { msg.sender() };
    format!("[{}] {who}: {}", msg.timestamp().format("%H:%M:%S"), msg.content())
}

/// Prints only what's new in the current room since the last update.
///
/// Switching rooms prints the new room's history from the start.
#[derive(Default)]
struct Printer {
    room: Option<RoomName>,
    shown: usize,
}

impl Printer {
    fn update(&mut self, session: &ClientSession, update: Update) {
        match update {
            Update::Notification(note) => println!("* {note}"),
            Update::StateChanged => self.print_new(session),
        }
    }

    fn print_new(&mut self, session: &ClientSession) {
        let messages = session.current_messages();
        let (switched, start) = self.advance(session.current_room(), messages.len());
        if switched {
            match session.current_room() {
                Some(room) => println!("-- {room} --"),
                None => println!("-- no room selected --"),
            }
        }
        for msg in &messages[start..] {
            println!("{}", format_message(msg, session.is_own(msg)));
        }
    }

    /// Records that `room` now holds `len` messages. Returns whether the
    /// room changed and the index of the first message not yet printed.
    fn advance(&mut self, room: Option<&RoomName>, len: usize) -> (bool, usize) {
        let switched = room != self.room.as_ref();
        if switched {
            self.room = room.cloned();
            self.shown = 0;
        }
        // History was cleared.
        if len < self.shown {
            self.shown = 0;
        }
        let start = self.shown;
        self.shown = len;
        (switched, start)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), ParleyError> {
    let args = Args::parse();
    parley::logging::init_tracing(&args.log);

    let mut config = ClientConfig::from_env()?;
    config.url = args.url;
    if args.reconnect {
        config.reconnect = Some(ReconnectConfig::default());
    }
    if args.preserve_history {
        config.session.history_policy = HistoryPolicy::Preserve;
    }

    eprintln!("connecting to {} (/help for commands)", config.url);
    let client = ChatClientBuilder::from_config(config).build()?;

    let (actions, actions_rx) = mpsc::unbounded_channel();
    if let Some(name) = args.username {
        let _ = actions.send(UserAction::SetUsername(name));
    }

    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
        username: String::new(),
        current_room: None,
        rooms: Vec::new(),
    });
    spawn_input(actions, snapshot_rx);

    let mut printer = Printer::default();
    client
        .run(actions_rx, |session, update| {
            snapshot_tx.send_replace(session.snapshot());
            printer.update(session, update);
        })
        .await;

    Ok(())
}
