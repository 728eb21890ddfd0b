use rendezvous_client::{CallState, EndReason};
use rendezvous_core::{NegotiationRecord, Role, RoomStatus, SignalingStore, server_timestamp};
use rendezvous_server::MemoryStore;
use serde_json::json;

use crate::utils::{Participant, init_tracing, rooms_path, wait_for_state};

#[tokio::test]
async fn test_malformed_candidate_fails_session() {
    init_tracing();
    let shared = MemoryStore::new();
    shared
        .push_child(
            &rooms_path(),
            json!({ "status": "waiting", "created": server_timestamp() }),
        )
        .await
        .unwrap();

    let b = Participant::new("b", &shared);
    let mut states = b.client.subscribe();
    b.client.join().await.unwrap();
    let room = b.room();

    // Play the Caller by hand.
    shared
        .set_value(
            &room.offer(),
            serde_json::to_value(NegotiationRecord::offer("v=0 manual")).unwrap(),
        )
        .await
        .unwrap();
    b.wait_for(CallState::Negotiating).await;

    shared
        .push_child(&room.local_candidates(Role::Caller), json!({ "mediaLineId": "0" }))
        .await
        .unwrap();

    let ended = wait_for_state(&mut states, |s| s.state.is_terminal()).await;
    assert_eq!(ended.state, CallState::Failed);
    assert_eq!(ended.reason, Some(EndReason::MalformedSignalingRecord));
    assert!(b.engine().remote_candidates().is_empty());

    let status = shared.get_value(&room.status()).await.unwrap();
    assert_eq!(status, Some(RoomStatus::Disconnected.to_value()));
}
