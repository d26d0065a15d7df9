//! Unified error type for the Parley client.

use parley_protocol::ProtocolError;
use parley_session::SessionError;
use parley_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    /// A transport-level error (endpoint, connect, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (a field that can't be encoded).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (configuration).
    #[error(transparent)]
    Session(#[from] SessionError),
}
