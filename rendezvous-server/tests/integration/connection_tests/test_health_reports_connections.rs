use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::utils::{WsTestClient, init_tracing, spawn_server};

#[tokio::test]
async fn test_health_reports_connections() {
    init_tracing();
    let (addr, service) = spawn_server().await;
    let client = WsTestClient::connect(addr).await.expect("connect");

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut body = String::new();
    stream.read_to_string(&mut body).await.unwrap();

    assert!(body.starts_with("HTTP/1.1 200"), "unexpected response: {body}");
    assert!(body.contains(r#""status":"ok""#));

    // The upgrade callback registers the connection asynchronously.
    for _ in 0..40 {
        if service.connection_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(service.connection_count(), 1);

    client.close().await.unwrap();
}
