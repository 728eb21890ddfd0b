use rendezvous_core::{StorePath, StoreRequest, StoreResponse, server_timestamp};
use serde_json::json;

use crate::utils::{WsTestClient, init_tracing, spawn_server};

#[tokio::test]
async fn test_push_and_query_first() {
    init_tracing();
    let (addr, _service) = spawn_server().await;
    let mut client = WsTestClient::connect(addr).await.expect("connect");
    let rooms = StorePath::new("rooms");

    let StoreResponse::Pushed { key, .. } = client
        .call(StoreRequest::Push {
            id: 1,
            path: rooms.clone(),
            value: json!({ "status": "waiting", "created": server_timestamp() }),
        })
        .await
        .unwrap()
    else {
        panic!("expected Pushed");
    };

    let found = client
        .call(StoreRequest::QueryFirst {
            id: 2,
            path: rooms.clone(),
            child: "status".into(),
            equals: json!("waiting"),
        })
        .await
        .unwrap();

    let StoreResponse::QueryResult {
        id,
        key: Some(found_key),
        value: Some(value),
    } = found
    else {
        panic!("expected a matching room, got {found:?}");
    };
    assert_eq!(id, 2);
    assert_eq!(found_key, key);
    assert!(value["created"].is_u64(), "server timestamp not resolved");

    let none = client
        .call(StoreRequest::QueryFirst {
            id: 3,
            path: rooms,
            child: "status".into(),
            equals: json!("matched"),
        })
        .await
        .unwrap();
    assert_eq!(
        none,
        StoreResponse::QueryResult {
            id: 3,
            key: None,
            value: None,
        }
    );
}
