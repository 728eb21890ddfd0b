use rendezvous_core::{StorePath, StoreRequest, StoreResponse};
use serde_json::json;

use crate::utils::{WsTestClient, init_tracing, spawn_server};

#[tokio::test]
async fn test_value_subscription_streams_changes() {
    init_tracing();
    let (addr, _service) = spawn_server().await;
    let mut watcher = WsTestClient::connect(addr).await.expect("connect watcher");
    let mut writer = WsTestClient::connect(addr).await.expect("connect writer");
    let status = StorePath::new("rooms/r1/status");

    let subscribed = watcher
        .call(StoreRequest::SubscribeValue {
            id: 10,
            path: status.clone(),
        })
        .await
        .unwrap();
    assert_eq!(subscribed, StoreResponse::Subscribed { id: 10 });
    assert_eq!(
        watcher.recv().await.unwrap(),
        StoreResponse::ValueChanged {
            sub: 10,
            value: None,
        }
    );

    writer
        .call(StoreRequest::Set {
            id: 1,
            path: status.clone(),
            value: json!("waiting"),
        })
        .await
        .unwrap();
    writer
        .call(StoreRequest::Remove {
            id: 2,
            path: StorePath::new("rooms/r1"),
        })
        .await
        .unwrap();

    assert_eq!(
        watcher.recv().await.unwrap(),
        StoreResponse::ValueChanged {
            sub: 10,
            value: Some(json!("waiting")),
        }
    );
    assert_eq!(
        watcher.recv().await.unwrap(),
        StoreResponse::ValueChanged {
            sub: 10,
            value: None,
        }
    );
}

#[tokio::test]
async fn test_unsubscribe_stops_child_events() {
    init_tracing();
    let (addr, _service) = spawn_server().await;
    let mut watcher = WsTestClient::connect(addr).await.expect("connect watcher");
    let mut writer = WsTestClient::connect(addr).await.expect("connect writer");
    let list = StorePath::new("rooms/r1/callerCandidates");

    writer
        .call(StoreRequest::Push {
            id: 1,
            path: list.clone(),
            value: json!({ "payload": "c1", "mediaLineIndex": 0 }),
        })
        .await
        .unwrap();

    watcher
        .call(StoreRequest::SubscribeChildAdded {
            id: 3,
            path: list.clone(),
        })
        .await
        .unwrap();
    let replayed = watcher.recv().await.unwrap();
    assert!(matches!(replayed, StoreResponse::ChildAdded { sub: 3, ref value, .. } if value["payload"] == "c1"));

    let ack = watcher.call(StoreRequest::Unsubscribe { id: 3 }).await.unwrap();
    assert_eq!(ack, StoreResponse::Ack { id: 3 });

    writer
        .call(StoreRequest::Push {
            id: 2,
            path: list,
            value: json!({ "payload": "c2", "mediaLineIndex": 0 }),
        })
        .await
        .unwrap();
    assert!(watcher.is_quiet_for(300).await, "event after unsubscribe");
}
