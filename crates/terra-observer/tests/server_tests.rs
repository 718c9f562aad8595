//! Listener tests over a real loopback socket.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use terra_observer::server::{ServerConfig, ServerError, bind, serve};
use terra_observer::state::AppState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn loopback() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
    }
}

#[tokio::test]
async fn test_serves_health_and_stops_on_shutdown() {
    let listener = bind(&loopback()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, Arc::new(AppState::default()), async {
        let _ = stop_rx.await;
    }));

    let mut conn = TcpStream::connect(addr).await.unwrap();
    conn.write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    conn.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    stop_tx.send(()).unwrap();
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_port_in_use_is_a_bind_error() {
    let taken = bind(&loopback()).await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let result = bind(&ServerConfig { port, ..loopback() }).await;

    match result {
        Err(ServerError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
        other => panic!("expected bind error, got {other:?}"),
    }
}
