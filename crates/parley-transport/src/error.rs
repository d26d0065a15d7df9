/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint is not a WebSocket URL.
    #[error("invalid endpoint {0:?}: expected a ws:// or wss:// URL")]
    InvalidUrl(String),

    /// Opening the connection failed (refused, DNS, handshake).
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The connection was already closed when we tried to use it.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The manager's driver has stopped.
    #[error("connection manager shut down")]
    Shutdown,
}
