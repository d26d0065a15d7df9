//! Error types for the protocol layer.
//!
//! Decoding never fails: a line that matches no known shape becomes
//! [`Frame::Unrecognized`](crate::Frame::Unrecognized). Errors only come
//! from building values that would not survive the trip over the wire.

/// Errors that can occur in the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A field that the wire format requires was empty.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// A field contains a character that the line format reserves as a
    /// delimiter (`:` or `,`) or as a frame terminator (`\n`, `\r`).
    #[error("{field} contains reserved character {ch:?}")]
    InvalidCharacter { field: &'static str, ch: char },

    /// The line is not a command this protocol knows about.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
