//! `ChatClient` builder and event loop.
//!
//! This is the entry point for running a chat client. It ties together
//! all the layers: transport → protocol → room store → session.

use std::time::Duration;

use parley_session::{
    HistoryPolicy, Notification, SessionConfig, SessionController,
    SessionSnapshot,
};
use parley_transport::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, Connector,
    ReconnectConfig, WebSocketConnector,
};
use tokio::sync::mpsc;

use crate::{ClientConfig, ParleyError};

/// How long to keep forwarding connection events after the user quits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SetUsername(String),
    CreateRoom(String),
    JoinRoom(String),
    /// Leave the selected room.
    LeaveRoom,
    /// Post to the selected room.
    SendMessage(String),
    Quit,
}

/// What the event loop reports after each transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A connection change worth showing the user.
    Notification(Notification),
    /// Rooms, messages, username or selection changed.
    StateChanged,
}

/// The session type the event loop drives.
pub type ClientSession = SessionController<ConnectionHandle>;

/// Builder for configuring a [`ChatClient`].
///
/// # Example
///
/// ```rust,no_run
/// use parley::prelude::*;
///
/// # fn main() -> Result<(), ParleyError> {
/// let client = ChatClient::builder()
///     .url("ws://localhost:8080")
///     .history_policy(HistoryPolicy::Preserve)
///     .build()?;
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatClientBuilder {
    config: ClientConfig,
}

impl ChatClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing config, e.g. [`ClientConfig::from_env`].
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Sets the server endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Enables reconnecting with the given backoff.
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = Some(reconnect);
        self
    }

    pub fn history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.config.session.history_policy = policy;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Validates the endpoint and builds a WebSocket client.
    ///
    /// Nothing connects until [`ChatClient::run`].
    ///
    /// # Errors
    /// Returns [`ParleyError::Transport`] if the URL isn't `ws://` or
    /// `wss://`.
    pub fn build(self) -> Result<ChatClient<WebSocketConnector>, ParleyError> {
        let connector = WebSocketConnector::new(self.config.url.as_str())?;
        Ok(ChatClient::with_connector(connector, self.config))
    }
}

/// A chat client, ready to run.
pub struct ChatClient<C: Connector> {
    connector: C,
    reconnect: Option<ReconnectConfig>,
    session_config: SessionConfig,
}

impl ChatClient<WebSocketConnector> {
    /// Creates a new builder.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }
}

impl<C: Connector> ChatClient<C> {
    /// Creates a client over any connector. `config.url` is not used: the
    /// connector already knows where to go.
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self {
            connector,
            reconnect: config.reconnect,
            session_config: config.session,
        }
    }

    /// Connects and runs the event loop until the user quits, `actions`
    /// closes, or the connection closes for good.
    ///
    /// Every state transition happens on this one task, in arrival order:
    /// one connection event or one user action at a time. `on_update` is
    /// called after each transition that changed something.
    ///
    /// Returns the final visible state.
    pub async fn run<F>(
        self,
        mut actions: mpsc::UnboundedReceiver<UserAction>,
        mut on_update: F,
    ) -> SessionSnapshot
    where
        F: FnMut(&ClientSession, Update),
    {
        let mut manager = ConnectionManager::spawn(self.connector, self.reconnect);
        let mut session = SessionController::new(manager.handle(), self.session_config);
        tracing::info!("chat client running");

        loop {
            tokio::select! {
                event = manager.next_event() => {
                    let Some(event) = event else {
                        tracing::info!("connection closed for good");
                        return session.snapshot();
                    };
                    if let Some(update) = on_event(&mut session, event) {
                        on_update(&session, update);
                    }
                }
                action = actions.recv() => match action {
                    Some(UserAction::Quit) | None => break,
                    Some(action) => {
                        if dispatch(&mut session, action) {
                            on_update(&session, Update::StateChanged);
                        }
                    }
                },
            }
        }

        tracing::info!("quitting");
        manager.handle().close();
        let drain = async {
            while let Some(event) = manager.next_event().await {
                if let Some(update) = on_event(&mut session, event) {
                    on_update(&session, update);
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            tracing::debug!("connection did not close in time");
        }
        session.snapshot()
    }
}

fn on_event(session: &mut ClientSession, event: ConnectionEvent) -> Option<Update> {
    match event {
        ConnectionEvent::Line(line) => {
            tracing::trace!(%line, "recv");
            session.handle_line(&line).then_some(Update::StateChanged)
        }
        other => session.on_connection_event(other).map(Update::Notification),
    }
}

/// Applies one action. Returns `true` if the visible state changed.
fn dispatch(session: &mut ClientSession, action: UserAction) -> bool {
    match action {
        UserAction::SetUsername(name) => session.set_username(&name),
        UserAction::CreateRoom(name) => session.create_room(&name).is_some(),
        UserAction::JoinRoom(name) => session.join_room(&name).is_some(),
        UserAction::LeaveRoom => session.leave_room().is_some(),
        // No local echo, so nothing visible changes.
        UserAction::SendMessage(text) => {
            session.send_message(&text);
            false
        }
        UserAction::Quit => false,
    }
}
