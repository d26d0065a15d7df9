//! End-to-end tests: a `ChatClient` against an in-process chat server.
//!
//! The fake server speaks the same line protocol as the real one: it sends
//! the room list on connect, replays history on join, and fans room
//! messages back out as `MSG:` frames.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parley::prelude::*;
use parley::protocol::Command;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// =========================================================================
// Fake server
// =========================================================================

/// Serves a single client, then returns every line it received.
async fn spawn_server(rooms: &'static [&'static str]) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut rooms: Vec<String> = rooms.iter().map(|r| r.to_string()).collect();
        let mut received = Vec::new();

        let list = format!("ROOM_LIST:{}", rooms.join(","));
        ws.send(WsMessage::Text(list.into())).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let WsMessage::Text(text) = msg else { continue };
            let line = text.as_str().to_owned();
            received.push(line.clone());

            let replies: Vec<String> = match line.parse::<Command>() {
                Ok(Command::JoinRoom(room)) => {
                    vec![format!("bob [10:00:00]: welcome to {room}")]
                }
                Ok(Command::CreateRoom(room)) => {
                    rooms.push(room.to_string());
                    vec![format!("ROOM_LIST:{}", rooms.join(","))]
                }
                Ok(Command::RoomMessage { room, username, text }) => {
                    vec![format!("MSG:{room}:{username}:{text}")]
                }
                Ok(Command::LeaveRoom(_)) | Err(_) => Vec::new(),
            };
            for reply in replies {
                ws.send(WsMessage::Text(reply.into())).await.unwrap();
            }
        }
        received
    });

    (url, task)
}

// =========================================================================
// Client harness
// =========================================================================

struct Harness {
    actions: mpsc::UnboundedSender<UserAction>,
    updates: mpsc::UnboundedReceiver<(Update, SessionSnapshot)>,
    client: tokio::task::JoinHandle<SessionSnapshot>,
}

impl Harness {
    fn start(client: ChatClient<parley::transport::WebSocketConnector>) -> Self {
        let (actions, actions_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates) = mpsc::unbounded_channel();
        let client = tokio::spawn(client.run(actions_rx, move |session, update| {
            let _ = updates_tx.send((update, session.snapshot()));
        }));
        Self {
            actions,
            updates,
            client,
        }
    }

    fn act(&self, action: UserAction) {
        self.actions.send(action).unwrap();
    }

    /// Waits for the first update whose snapshot satisfies `pred`.
    async fn wait_for(
        &mut self,
        what: &str,
        pred: impl Fn(&Update, &SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let deadline = Duration::from_secs(5);
        loop {
            let (update, snapshot) = tokio::time::timeout(deadline, self.updates.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
                .unwrap_or_else(|| panic!("client stopped before {what}"));
            if pred(&update, &snapshot) {
                return snapshot;
            }
        }
    }

    async fn connected(&mut self) {
        self.wait_for("connect", |u, _| {
            *u == Update::Notification(Notification::Connected)
        })
        .await;
    }
}

fn room<'a>(snapshot: &'a SessionSnapshot, name: &str) -> Option<&'a Room> {
    snapshot.rooms.iter().find(|r| r.name() == name)
}

fn contents(snapshot: &SessionSnapshot, name: &str) -> Vec<String> {
    room(snapshot, name)
        .map(|r| r.messages().iter().map(|m| m.content().to_owned()).collect())
        .unwrap_or_default()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_client_join_history_send_and_echo() {
    let (url, server) = spawn_server(&["general", "random"]).await;
    let client = ChatClient::builder().url(url).build().unwrap();
    let mut h = Harness::start(client);

    h.connected().await;
    let snap = h
        .wait_for("room list", |_, s| s.rooms.len() == 2)
        .await;
    let names: Vec<_> = snap.rooms.iter().map(|r| r.name().as_str()).collect();
    assert_eq!(names, vec!["general", "random"]);

    h.act(UserAction::SetUsername("alice".into()));
    h.act(UserAction::JoinRoom("general".into()));
    let snap = h
        .wait_for("history", |_, s| !contents(s, "general").is_empty())
        .await;
    assert_eq!(snap.current_room.as_ref().unwrap(), "general");
    let history = &room(&snap, "general").unwrap().messages()[0];
    assert_eq!(history.sender(), "bob");
    assert_eq!(history.content(), "welcome to general");
    assert_eq!(history.timestamp().format("%H:%M:%S").to_string(), "10:00:00");

    h.act(UserAction::SendMessage("hi: there".into()));
    let snap = h
        .wait_for("echo", |_, s| contents(s, "general").len() == 2)
        .await;
    let echoed = &room(&snap, "general").unwrap().messages()[1];
    assert_eq!(echoed.sender(), "alice");
    assert_eq!(echoed.content(), "hi: there");

    h.act(UserAction::Quit);
    let last = h.client.await.unwrap();
    assert_eq!(last.username, "alice");

    let received = server.await.unwrap();
    assert_eq!(
        received,
        vec!["JOIN_ROOM:general", "ROOM_MSG:general:alice:hi: there"]
    );
}

#[tokio::test]
async fn test_client_create_room_is_optimistic_then_confirmed() {
    let (url, server) = spawn_server(&["general"]).await;
    let client = ChatClient::builder().url(url).build().unwrap();
    let mut h = Harness::start(client);
    h.connected().await;
    h.wait_for("room list", |_, s| s.rooms.len() == 1).await;

    h.act(UserAction::CreateRoom("dev".into()));
    let snap = h
        .wait_for("optimistic room", |u, s| {
            *u == Update::StateChanged && room(s, "dev").is_some()
        })
        .await;
    assert_eq!(snap.current_room.as_ref().unwrap(), "dev");

    // The server's follow-up room list keeps both rooms, in its order.
    let snap = h
        .wait_for("confirmed list", |_, s| {
            s.rooms.iter().map(|r| r.name().as_str()).eq(["general", "dev"])
        })
        .await;
    assert_eq!(snap.rooms.len(), 2);

    h.act(UserAction::LeaveRoom);
    let snap = h
        .wait_for("leave", |_, s| s.current_room.is_none())
        .await;
    assert!(room(&snap, "dev").is_some());

    drop(h.actions);
    h.client.await.unwrap();
    assert_eq!(
        server.await.unwrap(),
        vec!["CREATE_ROOM:dev", "LEAVE_ROOM:dev"]
    );
}

#[tokio::test]
async fn test_client_invalid_actions_send_nothing() {
    let (url, server) = spawn_server(&["general"]).await;
    let client = ChatClient::builder().url(url).build().unwrap();
    let mut h = Harness::start(client);
    h.connected().await;

    // No room selected, no username, empty and reserved names.
    h.act(UserAction::SendMessage("hello?".into()));
    h.act(UserAction::CreateRoom(String::new()));
    h.act(UserAction::CreateRoom("a:b".into()));
    h.act(UserAction::LeaveRoom);
    h.act(UserAction::JoinRoom("general".into()));
    h.act(UserAction::SendMessage("still no username".into()));
    h.act(UserAction::Quit);

    let last = h.client.await.unwrap();
    assert_eq!(last.current_room.as_ref().unwrap(), "general");
    assert_eq!(server.await.unwrap(), vec!["JOIN_ROOM:general"]);
}

#[tokio::test]
async fn test_client_server_gone_ends_run() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = ChatClient::builder().url(url).build().unwrap();
    let (_actions, actions_rx) = mpsc::unbounded_channel();
    let mut notes = Vec::new();

    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        client.run(actions_rx, |_, update| {
            if let Update::Notification(note) = update {
                notes.push(note);
            }
        }),
    )
    .await
    .expect("run should end when the connection can't be made");

    assert!(snapshot.rooms.is_empty());
    assert!(matches!(notes[0], Notification::ConnectionError(_)));
    assert_eq!(notes[1], Notification::Disconnected);
}
