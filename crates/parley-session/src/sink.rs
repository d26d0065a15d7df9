//! Where encoded commands go.

use parley_transport::ConnectionHandle;
use tokio::sync::mpsc;

/// Accepts encoded command lines, fire-and-forget.
///
/// A sink never reports failure back to the session: a line sent while
/// the connection is down is simply lost.
pub trait CommandSink {
    /// Hands one encoded line to the transport.
    fn send_line(&self, line: String);
}

impl CommandSink for ConnectionHandle {
    fn send_line(&self, line: String) {
        self.send(line);
    }
}

/// Collects lines in a channel. Used by tests and by in-process servers.
impl CommandSink for mpsc::UnboundedSender<String> {
    fn send_line(&self, line: String) {
        if self.send(line).is_err() {
            tracing::debug!("command sink closed, dropping line");
        }
    }
}

impl<S: CommandSink + ?Sized> CommandSink for &S {
    fn send_line(&self, line: String) {
        (**self).send_line(line);
    }
}
