use rendezvous_core::{StorePath, StoreRequest, StoreResponse};
use serde_json::json;

use crate::utils::{WsTestClient, init_tracing, spawn_server};

#[tokio::test]
async fn test_cas_over_websocket() {
    init_tracing();
    let (addr, _service) = spawn_server().await;
    let mut a = WsTestClient::connect(addr).await.expect("connect a");
    let mut b = WsTestClient::connect(addr).await.expect("connect b");
    let status = StorePath::new("rooms/r1/status");

    let ack = a
        .call(StoreRequest::Set {
            id: 1,
            path: status.clone(),
            value: json!("waiting"),
        })
        .await
        .unwrap();
    assert_eq!(ack, StoreResponse::Ack { id: 1 });

    // Both clients race to claim the same room; only the first commits.
    let first = a
        .call(StoreRequest::CompareAndSet {
            id: 2,
            path: status.clone(),
            expected: Some(json!("waiting")),
            value: Some(json!("matched")),
        })
        .await
        .unwrap();
    let second = b
        .call(StoreRequest::CompareAndSet {
            id: 7,
            path: status.clone(),
            expected: Some(json!("waiting")),
            value: Some(json!("matched")),
        })
        .await
        .unwrap();

    assert_eq!(first, StoreResponse::Committed { id: 2 });
    assert_eq!(
        second,
        StoreResponse::Aborted {
            id: 7,
            current: Some(json!("matched")),
        }
    );

    let snapshot = b
        .call(StoreRequest::Get {
            id: 8,
            path: status,
        })
        .await
        .unwrap();
    assert_eq!(
        snapshot,
        StoreResponse::Snapshot {
            id: 8,
            value: Some(json!("matched")),
        }
    );
}
