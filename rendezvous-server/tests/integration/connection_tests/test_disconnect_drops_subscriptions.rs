use std::time::Duration;

use rendezvous_core::{StorePath, StoreRequest};

use crate::utils::{WsTestClient, init_tracing, spawn_server};

#[tokio::test]
async fn test_disconnect_drops_subscriptions() {
    init_tracing();
    let (addr, service) = spawn_server().await;
    let mut client = WsTestClient::connect(addr).await.expect("connect");

    client
        .call(StoreRequest::SubscribeValue {
            id: 1,
            path: StorePath::new("rooms/r1/status"),
        })
        .await
        .unwrap();
    assert_eq!(service.store().subscriber_count().await, 1);

    client.close().await.unwrap();

    let mut remaining = usize::MAX;
    for _ in 0..40 {
        remaining = service.store().subscriber_count().await;
        if remaining == 0 && service.connection_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(remaining, 0);
    assert_eq!(service.connection_count(), 0);
}
