//! Client transport layer for Parley.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how a line reaches the chat server, and the [`ConnectionManager`] that
//! owns the single live connection and drives its lifecycle:
//!
//! ```text
//! Connecting ──→ Open ──→ Closed
//!      └────────────────────↑   (failure, explicit close, server close)
//! ```
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

mod error;
mod manager;
mod reconnect;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use manager::{ConnectionHandle, ConnectionManager};
pub use reconnect::ReconnectConfig;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// Lines can be sent and are being received.
    Open,
    /// No connection. Sends are dropped.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// What the connection manager reports to its listener, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection entered `Open`.
    Opened,
    /// One inbound line, without its terminator.
    Line(String),
    /// A transport failure. Always followed by [`ConnectionEvent::Closed`].
    Error(String),
    /// The connection entered `Closed`.
    Closed,
    /// A reconnect attempt will start after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
}

/// Opens connections to the chat server.
///
/// The manager calls [`connect`](Connector::connect) once at start and
/// again for every reconnect attempt.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single open connection that carries text.
///
/// Methods take `&mut self`: the manager's driver task is the only reader
/// and the only writer, so no locking is needed.
pub trait Connection: Send + 'static {
    /// Sends one line to the server.
    fn send(
        &mut self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next transport message from the server. It may hold
    /// several newline-separated lines.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
