//! The connection manager: one driver task that owns the connection.
//!
//! The driver is the only reader and writer of the connection. Everything
//! else talks to it through channels:
//!
//! ```text
//! ConnectionHandle::send ──(mpsc)──→ driver ──→ Connection::send
//! listener ←──(mpsc ConnectionEvent)── driver ←── Connection::recv
//! ```
//!
//! Sends are fire-and-forget. While the state is not `Open` they are
//! dropped on the spot; nothing is queued for a later connection.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{
    Connection, ConnectionEvent, ConnectionState, Connector, ReconnectConfig,
    TransportError,
};

/// Requests from handles to the driver.
#[derive(Debug)]
enum Outbound {
    Line(String),
    Close,
}

/// Cheap, cloneable handle for sending lines and closing the connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Returns `true` if the connection is `Open`.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Sends one line. Does nothing (and reports nothing) unless the
    /// connection is `Open`.
    pub fn send(&self, line: impl Into<String>) {
        if let Err(e) = self.try_send(line) {
            tracing::debug!(error = %e, "dropping line");
        }
    }

    /// Like [`send`](Self::send), but says why a line was dropped.
    ///
    /// # Errors
    /// [`TransportError::ConnectionClosed`] if the connection is not
    /// `Open`, [`TransportError::Shutdown`] if the driver has stopped.
    pub fn try_send(&self, line: impl Into<String>) -> Result<(), TransportError> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(TransportError::ConnectionClosed(format!("state is {state}")));
        }
        self.outbound
            .send(Outbound::Line(line.into()))
            .map_err(|_| TransportError::Shutdown)
    }

    /// Closes the connection and stops any reconnecting.
    pub fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Owns the connection lifecycle and reports it as [`ConnectionEvent`]s.
///
/// Dropping the manager stops its driver task.
pub struct ConnectionManager {
    handle: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    driver: JoinHandle<()>,
}

impl ConnectionManager {
    /// Starts connecting in a background task.
    ///
    /// With `reconnect: None`, the first disconnect is final.
    pub fn spawn<C: Connector>(
        connector: C,
        reconnect: Option<ReconnectConfig>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            connector,
            reconnect,
            state: state_tx,
            outbound: outbound_rx,
            events: events_tx,
        };

        Self {
            handle: ConnectionHandle {
                state: state_rx,
                outbound: outbound_tx,
            },
            events: events_rx,
            driver: tokio::spawn(driver.run()),
        }
    }

    /// Returns a handle for sending and closing.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Waits for the next event. Returns `None` once the driver has
    /// stopped and every event has been delivered.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

// ---------------------------------------------------------------------------
// Driver task
// ---------------------------------------------------------------------------

/// Why a connection's pump loop ended.
enum PumpExit {
    /// The server closed the connection.
    Remote,
    /// The transport failed.
    Failed(TransportError),
    /// A handle asked to close, or every handle and the listener are gone.
    Shutdown,
}

struct Driver<C: Connector> {
    connector: C,
    reconnect: Option<ReconnectConfig>,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        // Consecutive failed attempts; reset whenever a connection opens.
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            if self.discard_stale_outbound() {
                self.set_state(ConnectionState::Closed);
                self.emit(ConnectionEvent::Closed);
                return;
            }

            match self.connector.connect().await {
                Ok(mut conn) => {
                    attempt = 0;
                    let conn_id = conn.id();
                    tracing::info!(%conn_id, "connection open");
                    self.set_state(ConnectionState::Open);
                    if !self.emit(ConnectionEvent::Opened) {
                        return;
                    }

                    let exit =
                        pump(&mut conn, &mut self.outbound, &self.events).await;
                    self.set_state(ConnectionState::Closed);

                    match exit {
                        PumpExit::Remote => {
                            tracing::info!(%conn_id, "connection closed by server");
                        }
                        PumpExit::Failed(e) => {
                            tracing::warn!(%conn_id, error = %e, "connection failed");
                            self.emit(ConnectionEvent::Error(e.to_string()));
                        }
                        PumpExit::Shutdown => {
                            tracing::info!(%conn_id, "closing connection");
                            if let Err(e) = conn.close().await {
                                tracing::debug!(%conn_id, error = %e, "close failed");
                            }
                            self.emit(ConnectionEvent::Closed);
                            return;
                        }
                    }
                    if !self.emit(ConnectionEvent::Closed) {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "connect failed");
                    self.set_state(ConnectionState::Closed);
                    self.emit(ConnectionEvent::Error(e.to_string()));
                    if !self.emit(ConnectionEvent::Closed) {
                        return;
                    }
                }
            }

            let Some(delay) =
                self.reconnect.as_ref().and_then(|r| r.delay_for(attempt))
            else {
                tracing::debug!(attempt, "not reconnecting");
                return;
            };
            attempt += 1;

            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
            if !self.emit(ConnectionEvent::Reconnecting { attempt, delay }) {
                return;
            }
            if !self.wait(delay).await {
                return;
            }
        }
    }

    /// Sleeps through a backoff delay. Returns `false` if a close was
    /// requested meanwhile.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                outbound = self.outbound.recv() => match outbound {
                    Some(Outbound::Line(_)) => {
                        tracing::debug!("connection not open, dropping line");
                    }
                    Some(Outbound::Close) | None => return false,
                },
            }
        }
    }

    /// Drops lines that raced a state change. Returns `true` if a close
    /// request was among them.
    fn discard_stale_outbound(&mut self) -> bool {
        while let Ok(outbound) = self.outbound.try_recv() {
            match outbound {
                Outbound::Line(_) => {
                    tracing::debug!("connection not open, dropping line");
                }
                Outbound::Close => return true,
            }
        }
        false
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Delivers an event. Returns `false` if nobody is listening anymore.
    fn emit(&self, event: ConnectionEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Moves lines both ways until the connection ends.
async fn pump<T: Connection>(
    conn: &mut T,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
) -> PumpExit {
    loop {
        tokio::select! {
            request = outbound.recv() => match request {
                Some(Outbound::Line(line)) => {
                    tracing::trace!(%line, "send");
                    if let Err(e) = conn.send(&line).await {
                        return PumpExit::Failed(e);
                    }
                }
                Some(Outbound::Close) | None => return PumpExit::Shutdown,
            },
            received = conn.recv() => match received {
                Ok(Some(data)) => {
                    for line in split_lines(&data) {
                        tracing::trace!(%line, "recv");
                        if events.send(ConnectionEvent::Line(line.to_owned())).is_err() {
                            return PumpExit::Shutdown;
                        }
                    }
                }
                Ok(None) => return PumpExit::Remote,
                Err(e) => return PumpExit::Failed(e),
            },
        }
    }
}

/// Splits a transport message into frames: one per `\n`, trailing `\r`
/// trimmed, empty lines skipped.
fn split_lines(data: &str) -> impl Iterator<Item = &str> {
    data.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_single_line() {
        let lines: Vec<_> = split_lines("ROOM_LIST:general").collect();
        assert_eq!(lines, vec!["ROOM_LIST:general"]);
    }

    #[test]
    fn test_split_lines_multiple_and_crlf() {
        let lines: Vec<_> =
            split_lines("alice [10:00:00]: hi\r\nbob [10:00:01]: yo\n").collect();
        assert_eq!(lines, vec!["alice [10:00:00]: hi", "bob [10:00:01]: yo"]);
    }

    #[test]
    fn test_split_lines_skips_empty_lines() {
        let lines: Vec<_> = split_lines("\n\na\n\r\nb").collect();
        assert_eq!(lines, vec!["a", "b"]);
    }
}
