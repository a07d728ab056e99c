//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use duet_transport::{
        Connection, Transport, TransportError, WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    const HANDSHAKE_LIMIT: Duration = Duration::from_secs(5);

    /// Binds a transport on port 0, connects one client, and returns both
    /// ends.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server_handle = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("should accept");
            WebSocketTransport::upgrade(incoming, HANDSHAKE_LIMIT)
                .await
                .expect("should upgrade")
        });

        let (client_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends, client receives ---
        server_conn
            .send(br#"{"hello":"client"}"#)
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "UTF-8 payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"hello":"client"}"#);

        // --- Client sends, server receives ---
        client_ws
            .send(Message::Binary(b"hello from client".to_vec().into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_received_as_bytes() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws
            .send(Message::Text(r#"{"seq":1}"#.into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, br#"{"seq":1}"#);
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let (server_conn, mut client_ws) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        // Park a reader on the connection.
        let reader = Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A concurrent send must not wait for the reader.
        tokio::time::timeout(Duration::from_secs(1), server_conn.send(b"push"))
            .await
            .expect("send must not block behind recv")
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"push");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_does_not_wait_for_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        // A peer that opens TCP and never speaks.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();

        let silent = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept must return without waiting on the peer")
            .expect("should accept");

        let upgrade = tokio::spawn(WebSocketTransport::upgrade(
            silent,
            Duration::from_millis(100),
        ));

        // A well-behaved client behind it is still admitted.
        let client = tokio::spawn(tokio_tungstenite::connect_async(format!("ws://{addr}")));
        let incoming = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("second accept must not queue behind the silent peer")
            .expect("should accept");
        let conn = WebSocketTransport::upgrade(incoming, HANDSHAKE_LIMIT)
            .await
            .expect("should upgrade");
        let (mut client_ws, _) = client.await.unwrap().expect("client should connect");

        conn.send(b"hi").await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hi");

        let err = match upgrade.await.unwrap() {
            Ok(_) => panic!("silent peer must not upgrade"),
            Err(e) => e,
        };
        assert!(matches!(err, TransportError::HandshakeTimedOut(_)));
    }
}
