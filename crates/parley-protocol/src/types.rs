//! Core protocol types for Parley's wire format.
//!
//! Every value here either becomes one line on the wire ([`Command`]) or is
//! produced from one received line ([`Frame`]). [`RoomName`] and [`Message`]
//! are the pieces both directions share.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::codec::{CREATE_ROOM, JOIN_ROOM, LEAVE_ROOM, ROOM_MSG};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// RoomName
// ---------------------------------------------------------------------------

/// The unique, case-sensitive name of a chat room.
///
/// A newtype over `String` so a room name can't be passed where a username
/// or message text is expected. The only invariant enforced here is that the
/// name is non-empty: names received from the server are accepted as-is,
/// and the stricter delimiter rules are checked when a command is encoded.
///
/// `#[serde(transparent)]` serializes this as the bare string, so
/// `RoomName("general")` becomes `"general"` in JSON.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmptyField`] if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ProtocolError::EmptyField { field: "room name" });
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RoomName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RoomName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One chat message as the client sees it.
///
/// Fields are private: a message is immutable once decoded, and it is
/// owned by exactly one room's history.
///
/// The timestamp is local wall-clock time. For history lines it is the
/// server's `HH:MM:SS` on the day the line was received. For frames that
/// carry no time it is the moment the line arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: String,
    content: String,
    timestamp: NaiveDateTime,
}

impl Message {
    /// Creates a message.
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Who sent the message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// The message text. May be empty.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// When the message was sent (or received, see the type docs).
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Returns `true` if `username` sent this message.
    ///
    /// Messages have no identity on the wire, so "is this mine" is plain
    /// string equality on the sender. An unset (empty) username owns
    /// nothing.
    pub fn is_from(&self, username: &str) -> bool {
        !username.is_empty() && self.sender == username
    }
}

// ---------------------------------------------------------------------------
// Command: client → server
// ---------------------------------------------------------------------------

/// A command the client sends to the server. Each one is a single line.
///
/// ```text
/// CREATE_ROOM:<room>
/// JOIN_ROOM:<room>
/// LEAVE_ROOM:<room>
/// ROOM_MSG:<room>:<username>:<text>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a room (the server also joins the sender to it).
    CreateRoom(RoomName),

    /// Join a room. The server answers with the room's history.
    JoinRoom(RoomName),

    /// Stop receiving a room's messages.
    LeaveRoom(RoomName),

    /// Post `text` to `room` as `username`.
    RoomMessage {
        room: RoomName,
        username: String,
        text: String,
    },
}

impl Command {
    /// The room this command targets.
    pub fn room(&self) -> &RoomName {
        match self {
            Self::CreateRoom(room)
            | Self::JoinRoom(room)
            | Self::LeaveRoom(room)
            | Self::RoomMessage { room, .. } => room,
        }
    }
}

/// Parses a command line the way a server reads it.
///
/// The message text of `ROOM_MSG` keeps any colons after the third field.
/// The client never needs this direction; in-process test servers do.
impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(room) = line.strip_prefix(CREATE_ROOM) {
            return Ok(Self::CreateRoom(RoomName::new(room)?));
        }
        if let Some(room) = line.strip_prefix(JOIN_ROOM) {
            return Ok(Self::JoinRoom(RoomName::new(room)?));
        }
        if let Some(room) = line.strip_prefix(LEAVE_ROOM) {
            return Ok(Self::LeaveRoom(RoomName::new(room)?));
        }
        if let Some(rest) = line.strip_prefix(ROOM_MSG) {
            let mut parts = rest.splitn(3, ':');
            if let (Some(room), Some(username), Some(text)) =
                (parts.next(), parts.next(), parts.next())
            {
                return Ok(Self::RoomMessage {
                    room: RoomName::new(room)?,
                    username: username.to_owned(),
                    text: text.to_owned(),
                });
            }
        }

        Err(ProtocolError::InvalidMessage(format!("unknown command: {line}")))
    }
}

// ---------------------------------------------------------------------------
// Frame: server → client
// ---------------------------------------------------------------------------

/// A classified line received from the server.
///
/// Decoding turns the ad-hoc text shapes into this tagged union once, so
/// the room store never has to guess a frame's meaning from its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `ROOM_LIST:a,b,c`: the full set of rooms the server knows, in
    /// wire order. Empty entries are already dropped.
    RoomList(Vec<RoomName>),

    /// `MSG:room:sender:content`: a message addressed to a named room,
    /// stamped with its receipt time.
    DirectMessage { room: RoomName, message: Message },

    /// `sender [HH:MM:SS]: content`: a replayed message. It carries no
    /// room, so the session decides where it belongs.
    HistoryMessage(Message),

    /// `sender: content`: a live fan-out message without a time or room.
    /// Routed like a history message, stamped with its receipt time.
    Broadcast(Message),

    /// Anything else. Carried verbatim for logging and then dropped.
    Unrecognized(String),
}

impl Frame {
    /// Returns `true` for [`Frame::Unrecognized`].
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized(_))
    }
}

// =========================================================================
// Tests
// =========================================================================
