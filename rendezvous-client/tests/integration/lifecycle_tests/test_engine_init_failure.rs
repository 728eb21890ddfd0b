use rendezvous_client::{CallState, RendezvousError};
use rendezvous_server::MemoryStore;

use crate::utils::{MockEngineFactory, Participant, init_tracing, test_config};

#[tokio::test]
async fn test_engine_init_failure() {
    init_tracing();
    let shared = MemoryStore::new();
    let a = Participant::with_factory(&shared, test_config(), MockEngineFactory::failing("a"));

    let err = a.client.join().await.unwrap_err();

    assert!(matches!(err, RendezvousError::MediaEngineInitFailure(_)));
    assert!(a.store.writes().is_empty(), "no room may be created");
    assert_eq!(a.client.state(), CallState::Idle);
}
