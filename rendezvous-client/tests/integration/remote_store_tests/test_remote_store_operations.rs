use futures::StreamExt;
use rendezvous_core::{CasOutcome, SignalingStore, StoreError, StorePath};
use serde_json::json;

use crate::utils::{connect_remote, eventually, init_tracing, spawn_server};

#[tokio::test]
async fn test_remote_cas_and_query() {
    init_tracing();
    let (addr, _service) = spawn_server().await;
    let store = connect_remote(addr).await;
    let rooms = StorePath::new("rooms");

    let key = store
        .push_child(&rooms, json!({ "status": "waiting" }))
        .await
        .unwrap();
    let found = store
        .query_first_child(&rooms, "status", &json!("waiting"))
        .await
        .unwrap();
    assert_eq!(found.map(|(k, _)| k), Some(key.clone()));

    let status = rooms.child(&key).child("status");
    let first = store
        .compare_and_set(&status, Some(json!("waiting")), Some(json!("matched")))
        .await
        .unwrap();
    let second = store
        .compare_and_set(&status, Some(json!("waiting")), Some(json!("matched")))
        .await
        .unwrap();
    assert_eq!(first, CasOutcome::Committed);
    assert_eq!(
        second,
        CasOutcome::Aborted {
            current: Some(json!("matched"))
        }
    );
}

#[tokio::test]
async fn test_dropped_stream_unsubscribes() {
    init_tracing();
    let (addr, service) = spawn_server().await;
    let store = connect_remote(addr).await;
    let path = StorePath::new("rooms/r1/status");

    let mut updates = store.subscribe_value(&path).await.unwrap();
    assert_eq!(updates.next().await, Some(None));
    store.set_value(&path, json!("waiting")).await.unwrap();
    assert_eq!(updates.next().await, Some(Some(json!("waiting"))));
    assert_eq!(service.store().subscriber_count().await, 1);

    drop(updates);
    let memory = service.store().clone();
    eventually("server side subscription released", || {
        let memory = memory.clone();
        async move { memory.subscriber_count().await == 0 }
    })
    .await;
}

#[tokio::test]
async fn test_closed_server_is_unavailable() {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = rendezvous_client::RemoteStore::connect(
        &format!("ws://{addr}/ws"),
        std::time::Duration::from_secs(1),
    )
    .await;

    assert!(matches!(result, Err(StoreError::Unavailable(_))));
}
