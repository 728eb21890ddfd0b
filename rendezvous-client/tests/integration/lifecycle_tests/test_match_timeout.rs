use std::time::Duration;

use rendezvous_client::{CallState, ClientConfig, EndReason};
use rendezvous_core::SignalingStore;
use rendezvous_server::MemoryStore;

use crate::utils::{Participant, init_tracing, test_config, wait_for_state};

#[tokio::test]
async fn test_match_timeout() {
    init_tracing();
    let shared = MemoryStore::new();
    let a = Participant::with_config(
        "a",
        &shared,
        ClientConfig {
            match_timeout: Duration::from_millis(200),
            ..test_config()
        },
    );
    let mut states = a.client.subscribe();

    a.client.join().await.unwrap();
    let room = a.room();

    let ended = wait_for_state(&mut states, |s| s.state.is_terminal()).await;
    assert_eq!(ended.state, CallState::Failed);
    assert_eq!(ended.reason, Some(EndReason::Timeout));
    assert!(shared.get_value(room.path()).await.unwrap().is_none());
}
