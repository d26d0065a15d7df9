//! Wire protocol for Parley.
//!
//! This crate defines the "language" the chat client and server speak:
//!
//! - **Types** ([`RoomName`], [`Message`], [`Command`], [`Frame`]): the
//!   values that travel on the wire, one text line each.
//! - **Codec** ([`Codec`] trait, [`LineCodec`]): how commands become lines
//!   and how received lines are classified into frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw lines) and session
//! (rooms and the current user). It doesn't know about connections or
//! room state: it only knows how to turn lines into values and back.
//!
//! ```text
//! Transport (lines) → Protocol (Frame) → Session (room store)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{
    Codec, LineCodec, CREATE_ROOM, JOIN_ROOM, LEAVE_ROOM, MSG, ROOM_LIST,
    ROOM_MSG,
};
pub use error::ProtocolError;
pub use types::{Command, Frame, Message, RoomName};
