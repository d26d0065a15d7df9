//! The room store and its transition function.

use std::collections::HashMap;

use parley_protocol::{Message, RoomName};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A chat room and its message history, in arrival order.
///
/// Messages are never sorted by timestamp: history replayed by the server
/// and live messages interleave exactly as they were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    name: RoomName,
    messages: Vec<Message>,
}

impl Room {
    fn new(name: RoomName) -> Self {
        Self {
            name,
            messages: Vec::new(),
        }
    }

    /// The room's name.
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// The room's messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

// ---------------------------------------------------------------------------
// RoomEvent
// ---------------------------------------------------------------------------

/// A state transition for the [`RoomStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The authoritative room set. Rooms not listed are dropped.
    RoomList(Vec<RoomName>),

    /// Append `message` to `room`. Ignored if `room` is unknown.
    Message { room: RoomName, message: Message },
}

// ---------------------------------------------------------------------------
// RoomStore
// ---------------------------------------------------------------------------

/// Ordered mapping from room name to message history.
///
/// Room order is the order of the last room list, with rooms created
/// locally (through [`ensure_room`](Self::ensure_room)) appended at the end.
#[derive(Debug, Clone, Default)]
pub struct RoomStore {
    rooms: Vec<Room>,
    /// Position of each room in `rooms`.
    index: HashMap<RoomName, usize>,
}

impl RoomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event and returns the resulting store.
    #[must_use]
    pub fn apply(mut self, event: RoomEvent) -> Self {
        match event {
            RoomEvent::RoomList(names) => self.reconcile(names),
            RoomEvent::Message { room, message } => {
                match self.index.get(room.as_str()) {
                    Some(&pos) => self.rooms[pos].messages.push(message),
                    None => {
                        tracing::debug!(%room, "message for unknown room dropped");
                    }
                }
                self
            }
        }
    }

    /// Replaces the room set with `names`, keeping the history of rooms
    /// that survive. Duplicate names keep their first position.
    fn reconcile(self, names: Vec<RoomName>) -> Self {
        let mut previous: HashMap<RoomName, Vec<Message>> = self
            .rooms
            .into_iter()
            .map(|room| (room.name, room.messages))
            .collect();

        let mut rooms = Vec::with_capacity(names.len());
        let mut index = HashMap::with_capacity(names.len());
        for name in names {
            if index.contains_key(&name) {
                continue;
            }
            let messages = previous.remove(&name).unwrap_or_default();
            index.insert(name.clone(), rooms.len());
            rooms.push(Room { name, messages });
        }

        if !previous.is_empty() {
            tracing::debug!(dropped = previous.len(), "rooms removed by room list");
        }

        Self { rooms, index }
    }

    /// Appends an empty room named `name` unless it already exists.
    /// Returns `true` if the room was created.
    pub fn ensure_room(&mut self, name: &RoomName) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.clone(), self.rooms.len());
        self.rooms.push(Room::new(name.clone()));
        true
    }

    /// Empties a room's history. Returns `false` if the room is unknown.
    pub fn clear_messages(&mut self, name: &str) -> bool {
        match self.index.get(name) {
            Some(&pos) => {
                self.rooms[pos].messages.clear();
                true
            }
            None => false,
        }
    }

    /// Looks up a room by name.
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.index.get(name).map(|&pos| &self.rooms[pos])
    }

    /// A room's messages, or an empty slice if the room is unknown.
    pub fn messages(&self, name: &str) -> &[Message] {
        self.room(name).map(Room::messages).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The first room in store order.
    pub fn first(&self) -> Option<&Room> {
        self.rooms.first()
    }

    /// All rooms in store order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn names(&self) -> impl Iterator<Item = &RoomName> {
        self.rooms.iter().map(Room::name)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
