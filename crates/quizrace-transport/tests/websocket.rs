//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a plain tokio-tungstenite client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use quizrace_transport::{
        Connection, PendingConnection, Transport, TransportError, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, returns both ends.
    async fn pair() -> (quizrace_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.establish().await.expect("handshake should succeed")
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_send_text_and_receive() {
        let (conn, mut client) = pair().await;
        assert!(conn.id().get() > 0);

        conn.send(br#"{"type":"state"}"#).await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON payloads go out as text frames");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"state"}"#);

        client
            .send(Message::text(r#"{"type":"start"}"#))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"start"}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_non_utf8_goes_out_as_binary() {
        let (conn, mut client) = pair().await;

        conn.send(&[0xff, 0x00, 0xfe]).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0xfe]);
    }

    #[tokio::test]
    async fn test_send_while_recv_pending() {
        let (conn, mut client) = pair().await;
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        // Give the reader time to take the stream lock.
        tokio::task::yield_now().await;

        conn.send(b"tick").await.expect("send must not wait on recv");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"tick");

        client.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();
        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_bind_error_reports_address() {
        let result = WebSocketTransport::bind("not an address").await;
        match result {
            Err(TransportError::Bind { addr, .. }) => assert_eq!(addr, "not an address"),
            Err(other) => panic!("expected Bind error, got {other:?}"),
            Ok(_) => panic!("bind should fail"),
        }
    }

    #[tokio::test]
    async fn test_accept_after_shutdown_fails() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        transport.shutdown().await.unwrap();
        assert!(matches!(
            transport.accept().await,
            Err(TransportError::Shutdown)
        ));
    }

    #[tokio::test]
    async fn test_plain_tcp_client_fails_handshake() {
        use tokio::io::AsyncWriteExt;

        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"hello\r\n\r\n").await.unwrap();
            stream
        });

        let pending = transport.accept().await.expect("TCP accept should succeed");
        assert!(matches!(
            pending.establish().await,
            Err(TransportError::Handshake(_))
        ));
        drop(client.await.unwrap());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_handshake_timeout(Duration::from_millis(100));
        let addr = transport.local_addr().unwrap();

        // Connects and then says nothing.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();

        let pending = transport.accept().await.expect("TCP accept should succeed");
        assert_eq!(pending.peer_addr().ip(), addr.ip());
        match pending.establish().await {
            Err(TransportError::Handshake(reason)) => assert!(reason.contains("timed out")),
            Err(other) => panic!("expected Handshake error, got {other:?}"),
            Ok(_) => panic!("silent peer should not complete a handshake"),
        }
    }

    #[tokio::test]
    async fn test_accept_does_not_wait_for_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept should return before any handshake")
            .unwrap();

        let client = tokio::spawn(async move {
            tokio_tungstenite::connect_async(format!("ws://{addr}")).await
        });
        let next = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("second client should be accepted while the first is silent")
            .unwrap();
        let conn = next.establish().await.expect("handshake should succeed");
        assert!(client.await.unwrap().is_ok());
        assert!(conn.id().get() > 0);
        drop(stalled);
    }
}
