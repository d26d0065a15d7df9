//! Chat session management for Parley.
//!
//! The session is where the client's state lives: who the user is, which
//! room is selected, and every room's history. It sits between the user
//! and the wire:
//!
//! ```text
//! user action ──→ SessionController ──(encode)──→ CommandSink
//! inbound line ──→ SessionController ──(decode)──→ RoomStore
//! ```
//!
//! # Key types
//!
//! - [`SessionController`]: validates actions, emits commands, applies frames
//! - [`CommandSink`]: where encoded command lines go
//! - [`SessionConfig`] / [`HistoryPolicy`]: per-session behaviour
//! - [`Notification`]: connection changes worth showing the user
//! - [`SessionSnapshot`]: a serializable copy of the visible state

mod config;
mod controller;
mod error;
mod sink;

pub use config::{HistoryPolicy, SessionConfig};
pub use controller::{Notification, SessionController, SessionSnapshot};
pub use error::SessionError;
pub use sink::CommandSink;
