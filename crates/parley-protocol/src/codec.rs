//! Codec trait and the line codec.
//!
//! A "codec" (coder/decoder) converts between protocol values and wire
//! lines. The session layer doesn't care HOW a command is spelled on the
//! wire: it just needs something that implements [`Codec`]. Today that is
//! [`LineCodec`], the colon-delimited text format the chat server speaks.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{Command, Frame, Message, ProtocolError, RoomName};

/// Prefix of the create-room command.
pub const CREATE_ROOM: &str = "CREATE_ROOM:";
/// Prefix of the join-room command.
pub const JOIN_ROOM: &str = "JOIN_ROOM:";
/// Prefix of the leave-room command.
pub const LEAVE_ROOM: &str = "LEAVE_ROOM:";
/// Prefix of the post-message command.
pub const ROOM_MSG: &str = "ROOM_MSG:";
/// Prefix of the server's room list frame.
pub const ROOM_LIST: &str = "ROOM_LIST:";
/// Prefix of the server's addressed message frame.
pub const MSG: &str = "MSG:";

/// Time format of the bracketed token in history lines.
const HISTORY_TIME_FORMAT: &str = "%H:%M:%S";

/// Encodes commands to lines and classifies received lines into frames.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → one codec can be shared by the session and by tests
///   running on any Tokio worker thread.
/// - `'static` → the codec owns everything it needs.
pub trait Codec: Send + Sync + 'static {
    /// Encodes a command as one wire line (no trailing newline).
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmptyField`] or
    /// [`ProtocolError::InvalidCharacter`] when a field would corrupt the
    /// line format. Nothing is sent for such a command.
    fn encode(&self, command: &Command) -> Result<String, ProtocolError>;

    /// Classifies one received line. `received_at` stamps frames that carry
    /// no time of their own and supplies the calendar date for those that
    /// carry only a time of day.
    ///
    /// Pure: same input, same output. Never fails: unknown shapes come
    /// back as [`Frame::Unrecognized`].
    fn decode_at(&self, line: &str, received_at: NaiveDateTime) -> Frame;

    /// Classifies one received line, stamped with the local clock.
    fn decode(&self, line: &str) -> Frame {
        self.decode_at(line, Local::now().naive_local())
    }
}

// ---------------------------------------------------------------------------
// LineCodec
// ---------------------------------------------------------------------------

/// The colon-delimited text protocol.
///
/// ## Example
///
/// ```rust
/// use parley_protocol::{Codec, Command, Frame, LineCodec, RoomName};
///
/// let codec = LineCodec;
/// let general = RoomName::new("general").unwrap();
///
/// let line = codec.encode(&Command::JoinRoom(general)).unwrap();
/// assert_eq!(line, "JOIN_ROOM:general");
///
/// let frame = codec.decode("ROOM_LIST:general,random,");
/// assert!(matches!(frame, Frame::RoomList(rooms) if rooms.len() == 2));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode(&self, command: &Command) -> Result<String, ProtocolError> {
        match command {
            Command::CreateRoom(room) => {
                check_room(room)?;
                Ok(format!("{CREATE_ROOM}{room}"))
            }
            Command::JoinRoom(room) => {
                check_room(room)?;
                Ok(format!("{JOIN_ROOM}{room}"))
            }
            Command::LeaveRoom(room) => {
                check_room(room)?;
                Ok(format!("{LEAVE_ROOM}{room}"))
            }
            Command::RoomMessage {
                room,
                username,
                text,
            } => {
                check_room(room)?;
                check_field("username", username, &[':', '\n', '\r'])?;
                // Colons are fine here: the text is the last field.
                check_field("message text", text, &['\n', '\r'])?;
                Ok(format!("{ROOM_MSG}{room}:{username}:{text}"))
            }
        }
    }

    fn decode_at(&self, line: &str, received_at: NaiveDateTime) -> Frame {
        let line = line.trim_end_matches(['\r', '\n']);

        // Prefixed frames are terminal: a malformed one is unrecognized,
        // never reinterpreted as free text.
        if let Some(rest) = line.strip_prefix(ROOM_LIST) {
            return Frame::RoomList(decode_room_list(rest));
        }
        if let Some(rest) = line.strip_prefix(MSG) {
            return match decode_direct(rest, received_at) {
                Some((room, message)) => Frame::DirectMessage { room, message },
                None => Frame::Unrecognized(line.to_owned()),
            };
        }

        if let Some(message) = decode_history(line, received_at.date()) {
            return Frame::HistoryMessage(message);
        }
        if let Some(message) = decode_broadcast(line, received_at) {
            return Frame::Broadcast(message);
        }

        Frame::Unrecognized(line.to_owned())
    }
}

/// Validates a field against the characters the line format reserves.
fn check_field(
    field: &'static str,
    value: &str,
    reserved: &[char],
) -> Result<(), ProtocolError> {
    if value.is_empty() {
        return Err(ProtocolError::EmptyField { field });
    }
    match value.chars().find(|ch| reserved.contains(ch)) {
        Some(ch) => Err(ProtocolError::InvalidCharacter { field, ch }),
        None => Ok(()),
    }
}

fn check_room(room: &RoomName) -> Result<(), ProtocolError> {
    check_field("room name", room.as_str(), &[':', ',', '\n', '\r'])
}

/// `a,b,,c,` → `[a, b, c]`, in wire order.
fn decode_room_list(csv: &str) -> Vec<RoomName> {
    csv.split(',')
        .filter_map(|name| RoomName::new(name).ok())
        .collect()
}

/// `room:sender:content`.
///
/// The split is limited to three fields, so the content keeps any colons
/// it contains. Missing fields or an empty room yield `None`.
fn decode_direct(
    rest: &str,
    received_at: NaiveDateTime,
) -> Option<(RoomName, Message)> {
    let mut fields = rest.splitn(3, ':');
    let room = RoomName::new(fields.next()?).ok()?;
    let sender = fields.next()?;
    let content = fields.next()?;
    Some((room, Message::new(sender, content, received_at)))
}

/// `sender [HH:MM:SS]: content`.
///
/// The sender is everything before the `[`, trimmed, and must not be empty.
/// The content is whatever follows the `:` after the `]`, minus leading
/// whitespace, and may be empty. The time lands on `date`.
fn decode_history(line: &str, date: NaiveDate) -> Option<Message> {
    let (sender, rest) = line.split_once('[')?;
    let sender = sender.trim();
    if sender.is_empty() {
        return None;
    }

    let (time, rest) = rest.split_once(']')?;
    let time = NaiveTime::parse_from_str(time.trim(), HISTORY_TIME_FORMAT).ok()?;
    let content = rest.strip_prefix(':')?.trim_start();

    Some(Message::new(sender, content, date.and_time(time)))
}

/// `sender: content`: the server's live fan-out line.
///
/// Senders can't contain `:` (the command format forbids it) or `[` (that
/// would be a history line), which keeps unknown `PREFIX:...` lines out.
fn decode_broadcast(line: &str, received_at: NaiveDateTime) -> Option<Message> {
    let (sender, content) = line.split_once(": ")?;
    let sender = sender.trim();
    if sender.is_empty() || sender.contains([':', '[']) {
        return None;
    }
    Some(Message::new(sender, content, received_at))
}

// =========================================================================
// Tests
// =========================================================================
