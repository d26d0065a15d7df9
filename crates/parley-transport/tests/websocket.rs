//! Integration tests for the WebSocket transport.
//!
//! These spin up a real tokio-tungstenite server on a random local port and
//! drive a `ConnectionManager` against it.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use parley_transport::{
        Connection, ConnectionEvent, ConnectionManager, Connector,
        WebSocketConnector,
    };
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::Message;

    /// Binds to `127.0.0.1:0`, serves one connection with `handler`, and
    /// returns the `ws://` URL to dial.
    async fn serve_once<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have an address");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake should succeed");
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    fn text(s: &str) -> Message {
        Message::Text(s.to_owned().into())
    }

    async fn next_event(manager: &mut ConnectionManager) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(5), manager.next_event())
            .await
            .expect("timed out waiting for an event")
            .expect("event stream ended")
    }

    #[tokio::test]
    async fn test_websocket_connection_send_and_recv() {
        let url = serve_once(|mut ws| async move {
            ws.send(text("ROOM_LIST:general")).await.unwrap();
            if let Some(Ok(Message::Text(line))) = ws.next().await {
                ws.send(text(&format!("echo {}", line.as_str()))).await.unwrap();
            }
            let _ = ws.close(None).await;
        })
        .await;

        let connector = WebSocketConnector::new(url).unwrap();
        let mut conn = connector.connect().await.expect("should connect");
        assert!(conn.id().into_inner() > 0);

        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some("ROOM_LIST:general")
        );
        conn.send("JOIN_ROOM:general").await.unwrap();
        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some("echo JOIN_ROOM:general")
        );
        assert_eq!(conn.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_manager_over_websocket_round_trip() {
        let url = serve_once(|mut ws| async move {
            ws.send(text("ROOM_LIST:general,random")).await.unwrap();
            // Two frames in one transport message.
            ws.send(text("alice [09:15:00]: morning\nbob [09:16:30]: hey"))
                .await
                .unwrap();

            while let Some(Ok(msg)) = ws.next().await {
                let Message::Text(line) = msg else { continue };
                // ROOM_MSG:room:user:text -> MSG:room:user:text
                if let Some(rest) = line.as_str().strip_prefix("ROOM_MSG:") {
                    ws.send(text(&format!("MSG:{rest}"))).await.unwrap();
                    break;
                }
            }
            let _ = ws.close(None).await;
        })
        .await;

        let connector = WebSocketConnector::new(url).unwrap();
        let mut manager = ConnectionManager::spawn(connector, None);

        assert_eq!(next_event(&mut manager).await, ConnectionEvent::Opened);
        assert_eq!(
            next_event(&mut manager).await,
            ConnectionEvent::Line("ROOM_LIST:general,random".into())
        );
        assert_eq!(
            next_event(&mut manager).await,
            ConnectionEvent::Line("alice [09:15:00]: morning".into())
        );
        assert_eq!(
            next_event(&mut manager).await,
            ConnectionEvent::Line("bob [09:16:30]: hey".into())
        );

        manager.handle().send("ROOM_MSG:general:carol:hi: there");
        assert_eq!(
            next_event(&mut manager).await,
            ConnectionEvent::Line("MSG:general:carol:hi: there".into())
        );
        assert_eq!(next_event(&mut manager).await, ConnectionEvent::Closed);
    }

    #[tokio::test]
    async fn test_manager_connect_refused_reports_error() {
        // Grab a free port, then release it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WebSocketConnector::new(format!("ws://{addr}")).unwrap();
        let mut manager = ConnectionManager::spawn(connector, None);

        assert!(matches!(
            next_event(&mut manager).await,
            ConnectionEvent::Error(_)
        ));
        assert_eq!(next_event(&mut manager).await, ConnectionEvent::Closed);
    }
}
