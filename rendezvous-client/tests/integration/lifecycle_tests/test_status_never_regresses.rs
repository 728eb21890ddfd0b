use std::time::Duration;

use futures::StreamExt;
use rendezvous_client::{CallState, MediaConnectionState};
use rendezvous_core::{RoomStatus, SignalingStore};
use rendezvous_server::MemoryStore;

use crate::utils::{Participant, connect_pair, init_tracing};

#[tokio::test]
async fn test_status_never_regresses() {
    init_tracing();
    let shared = MemoryStore::new();
    let a = Participant::new("a", &shared);
    let b = Participant::new("b", &shared);
    connect_pair(&a, &b).await;
    let room = a.room();

    let mut updates = shared.subscribe_value(&room.status()).await.unwrap();
    b.client.leave().await;
    a.wait_for(CallState::Disconnected).await;
    // The late state report must not move the finished call anywhere.
    a.engine().emit_state(MediaConnectionState::Connected);

    let mut seen = Vec::new();
    while let Ok(Some(value)) = tokio::time::timeout(Duration::from_millis(200), updates.next()).await
    {
        seen.push(value.as_ref().and_then(RoomStatus::from_value));
    }

    assert_eq!(seen.first(), Some(&Some(RoomStatus::Matched)));
    for pair in seen.windows(2) {
        let (prev, next) = (pair[0].unwrap(), pair[1].unwrap());
        assert!(
            prev == next || prev.can_advance_to(next),
            "status moved from {prev:?} to {next:?}"
        );
    }
    assert_eq!(seen.last(), Some(&Some(RoomStatus::Disconnected)));
    assert_eq!(a.client.state(), CallState::Disconnected);
}
