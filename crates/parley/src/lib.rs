//! # Parley
//!
//! Chat client core for a line-based room chat protocol.
//!
//! Parley keeps one connection to a chat server, turns user actions
//! (create, join, leave, send) into wire commands, and folds everything
//! the server sends back into an ordered set of rooms with their message
//! histories, ready for a presentation layer to render.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), ParleyError> {
//! let client = ChatClient::builder()
//!     .url("ws://localhost:8080")
//!     .build()?;
//!
//! let (actions, rx) = mpsc::unbounded_channel();
//! actions.send(UserAction::SetUsername("alice".into())).ok();
//! actions.send(UserAction::JoinRoom("general".into())).ok();
//!
//! client
//!     .run(rx, |session, update| {
//!         if let Update::Notification(note) = update {
//!             println!("{note}");
//!         }
//!         for msg in session.current_messages() {
//!             println!("{}: {}", msg.sender(), msg.content());
//!         }
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `parley-transport`: connection lifecycle and the WebSocket connector
//! - `parley-protocol`: commands, frames and the line codec
//! - `parley-room`: the room and message store
//! - `parley-session`: the session controller

mod client;
mod config;
mod error;
pub mod logging;

pub use client::{ChatClient, ChatClientBuilder, ClientSession, Update, UserAction};
pub use config::{ClientConfig, DEFAULT_URL, ENV_HISTORY, ENV_RECONNECT, ENV_URL};
pub use error::ParleyError;

pub use parley_protocol as protocol;
pub use parley_room as room;
pub use parley_session as session;
pub use parley_transport as transport;

/// Everything a typical client needs.
pub mod prelude {
    pub use crate::{
        ChatClient, ChatClientBuilder, ClientConfig, ClientSession, ParleyError,
        Update, UserAction,
    };
    pub use parley_protocol::{Message, RoomName};
    pub use parley_room::Room;
    pub use parley_session::{
        HistoryPolicy, Notification, SessionConfig, SessionSnapshot,
    };
    pub use parley_transport::ReconnectConfig;
}
