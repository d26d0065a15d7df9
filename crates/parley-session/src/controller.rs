//! The session controller: the client's single owner of chat state.
//!
//! Every operation follows the same shape: validate, update local state
//! optimistically, then hand the encoded command to the sink. Nothing waits
//! for the server to confirm, and nothing is rolled back if it never does.
//!
//! Invalid actions (empty names, no room selected, no username) are no-ops:
//! they return `None`, send nothing, and leave the state untouched.

use std::fmt;
use std::time::Duration;

use parley_protocol::{Codec, Command, Frame, LineCodec, Message, RoomName};
use parley_room::{Room, RoomEvent, RoomStore};
use parley_transport::ConnectionEvent;
use serde::Serialize;

use crate::{CommandSink, HistoryPolicy, SessionConfig};

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A connection change the presentation layer should surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected,
    Disconnected,
    ConnectionError(String),
    Reconnecting { attempt: u32, delay: Duration },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected to chat server"),
            Self::Disconnected => write!(f, "Disconnected from chat server"),
            Self::ConnectionError(reason) => write!(f, "Connection error: {reason}"),
            Self::Reconnecting { attempt, delay } => write!(
                f,
                "Reconnecting in {:.1}s (attempt {attempt})",
                delay.as_secs_f64()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// A serializable copy of everything the user can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub username: String,
    pub current_room: Option<RoomName>,
    pub rooms: Vec<Room>,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Owns the username, the selected room and the room store, and turns user
/// actions into commands on `S`.
///
/// Invariant: if a room is selected, the store contains it.
pub struct SessionController<S, C = LineCodec> {
    sink: S,
    codec: C,
    config: SessionConfig,
    /// Empty means unset.
    username: String,
    current_room: Option<RoomName>,
    store: RoomStore,
    /// Rooms joined or created and not yet left. The server keeps a client
    /// in every room it joined, so live lines may come from any of these.
    joined: Vec<RoomName>,
    /// Set by the first `Opened`; every later one is a reconnect.
    has_connected: bool,
}

impl<S: CommandSink> SessionController<S> {
    /// Creates a session speaking the line protocol.
    pub fn new(sink: S, config: SessionConfig) -> Self {
        Self::with_codec(sink, LineCodec, config)
    }
}

impl<S: CommandSink, C: Codec> SessionController<S, C> {
    /// Creates a session with a custom codec.
    pub fn with_codec(sink: S, codec: C, config: SessionConfig) -> Self {
        Self {
            sink,
            codec,
            config,
            username: String::new(),
            current_room: None,
            store: RoomStore::new(),
            joined: Vec::new(),
            has_connected: false,
        }
    }

    // -- state ------------------------------------------------------------

    /// The active username. Empty if unset.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn current_room(&self) -> Option<&RoomName> {
        self.current_room.as_ref()
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    /// Messages of the selected room, or an empty slice.
    pub fn current_messages(&self) -> &[Message] {
        self.current_room
            .as_ref()
            .map(|room| self.store.messages(room.as_str()))
            .unwrap_or_default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns `true` if the local user sent `message`.
    pub fn is_own(&self, message: &Message) -> bool {
        message.is_from(&self.username)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            username: self.username.clone(),
            current_room: self.current_room.clone(),
            rooms: self.store.rooms().to_vec(),
        }
    }

    // -- user actions -----------------------------------------------------

    /// Sets the username, trimmed. An empty name unsets it.
    ///
    /// Returns `false` (and changes nothing) if the name contains `:` or a
    /// line break, since it could never be sent.
    pub fn set_username(&mut self, name: &str) -> bool {
        let name = name.trim();
        if let Some(ch) = name.chars().find(|c| matches!(c, ':' | '\n' | '\r')) {
            tracing::debug!(?ch, "username rejected");
            return false;
        }
        name.clone_into(&mut self.username);
        tracing::info!(username = %self.username, "username set");
        true
    }

    /// Creates `name`, adds it locally and selects it.
    ///
    /// The server treats creating an existing room as joining it and
    /// replays its history, so the history policy applies to known rooms.
    pub fn create_room(&mut self, name: &str) -> Option<Command> {
        let room = self.room_name(name)?;
        let command = Command::CreateRoom(room.clone());
        let line = self.encode(&command)?;

        if !self.store.ensure_room(&room) {
            self.apply_history_policy(&room);
        }
        self.mark_joined(&room);
        tracing::info!(%room, "room created");
        self.current_room = Some(room);

        self.sink.send_line(line);
        Some(command)
    }

    /// Selects `name`, adding it locally if unknown, and asks the server to
    /// join it.
    pub fn join_room(&mut self, name: &str) -> Option<Command> {
        let room = self.room_name(name)?;
        let command = Command::JoinRoom(room.clone());
        let line = self.encode(&command)?;

        self.store.ensure_room(&room);
        self.apply_history_policy(&room);
        self.mark_joined(&room);
        tracing::info!(%room, "joined room");
        self.current_room = Some(room);

        self.sink.send_line(line);
        Some(command)
    }

    /// Leaves the selected room and clears the selection.
    pub fn leave_room(&mut self) -> Option<Command> {
        let Some(room) = self.current_room.clone() else {
            tracing::debug!("no room selected, nothing to leave");
            return None;
        };
        let command = Command::LeaveRoom(room.clone());
        let line = self.encode(&command)?;

        self.current_room = None;
        self.joined.retain(|joined| *joined != room);
        self.apply_history_policy(&room);
        tracing::info!(%room, "left room");

        self.sink.send_line(line);
        Some(command)
    }

    /// Posts `text` to the selected room as the current user.
    ///
    /// There's no local echo: the message appears when the server sends it
    /// back.
    pub fn send_message(&mut self, text: &str) -> Option<Command> {
        if text.is_empty() {
            return None;
        }
        let Some(room) = self.current_room.clone() else {
            tracing::debug!("no room selected, message not sent");
            return None;
        };
        if self.username.is_empty() {
            tracing::debug!("no username set, message not sent");
            return None;
        }

        let command = Command::RoomMessage {
            room,
            username: self.username.clone(),
            text: text.to_owned(),
        };
        let line = self.encode(&command)?;
        self.sink.send_line(line);
        Some(command)
    }

    // -- inbound ----------------------------------------------------------

    /// Decodes one received line and applies it. Returns `true` if the
    /// visible state changed.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let frame = self.codec.decode(line);
        self.apply_frame(frame)
    }

    /// Applies an already-decoded frame. Returns `true` if the visible
    /// state changed.
    pub fn apply_frame(&mut self, frame: Frame) -> bool {
        match frame {
            Frame::RoomList(names) => {
                tracing::debug!(count = names.len(), "room list");
                self.apply_event(RoomEvent::RoomList(names));
                if let Some(room) = &self.current_room {
                    self.store.ensure_room(room);
                }
                true
            }
            Frame::DirectMessage { room, message } => {
                let known = self.store.contains(room.as_str());
                self.apply_event(RoomEvent::Message { room, message });
                known
            }
            Frame::HistoryMessage(message) => {
                let Some(room) = self.fallback_room() else {
                    tracing::debug!(sender = message.sender(), "no room for history, dropped");
                    return false;
                };
                self.apply_event(RoomEvent::Message { room, message });
                true
            }
            Frame::Broadcast(message) => {
                // A live line names no room; it is only attributable when
                // the client sits in exactly one.
                let [room] = self.joined.as_slice() else {
                    tracing::debug!(
                        sender = message.sender(),
                        joined = self.joined.len(),
                        "live message with ambiguous room, dropped"
                    );
                    return false;
                };
                let room = room.clone();
                let known = self.store.contains(room.as_str());
                self.apply_event(RoomEvent::Message { room, message });
                known
            }
            Frame::Unrecognized(line) => {
                tracing::debug!(%line, "unrecognized frame ignored");
                false
            }
        }
    }

    /// Reacts to a connection lifecycle event.
    ///
    /// `Line` events are applied through [`handle_line`](Self::handle_line)
    /// and never produce a notification. Every `Opened` after the first
    /// re-joins the selected room.
    pub fn on_connection_event(&mut self, event: ConnectionEvent) -> Option<Notification> {
        match event {
            ConnectionEvent::Opened => {
                if self.has_connected {
                    self.rejoin();
                }
                self.has_connected = true;
                Some(Notification::Connected)
            }
            ConnectionEvent::Line(line) => {
                self.handle_line(&line);
                None
            }
            ConnectionEvent::Error(reason) => Some(Notification::ConnectionError(reason)),
            ConnectionEvent::Closed => Some(Notification::Disconnected),
            ConnectionEvent::Reconnecting { attempt, delay } => {
                Some(Notification::Reconnecting { attempt, delay })
            }
        }
    }

    // -- internals --------------------------------------------------------

    fn rejoin(&mut self) {
        // A fresh connection starts with no server-side memberships.
        self.joined.clear();
        let Some(room) = self.current_room.clone() else {
            return;
        };
        let command = Command::JoinRoom(room.clone());
        if let Some(line) = self.encode(&command) {
            self.apply_history_policy(&room);
            self.mark_joined(&room);
            tracing::info!(%room, "re-joining room after reconnect");
            self.sink.send_line(line);
        }
    }

    fn mark_joined(&mut self, room: &RoomName) {
        if !self.joined.contains(room) {
            self.joined.push(room.clone());
        }
    }

    /// Where a history line goes: the selected room, else the first known
    /// room.
    fn fallback_room(&self) -> Option<RoomName> {
        self.current_room
            .clone()
            .or_else(|| self.store.first().map(|room| room.name().clone()))
    }

    fn apply_event(&mut self, event: RoomEvent) {
        self.store = std::mem::take(&mut self.store).apply(event);
    }

    fn apply_history_policy(&mut self, room: &RoomName) {
        if self.config.history_policy == HistoryPolicy::Clear {
            self.store.clear_messages(room.as_str());
        }
    }

    fn room_name(&self, name: &str) -> Option<RoomName> {
        match RoomName::new(name) {
            Ok(room) => Some(room),
            Err(e) => {
                tracing::debug!(error = %e, "room name rejected");
                None
            }
        }
    }

    fn encode(&self, command: &Command) -> Option<String> {
        match self.codec.encode(command) {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::debug!(error = %e, "command rejected");
                None
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
