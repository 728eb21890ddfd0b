use std::sync::Arc;
use std::time::Duration;

use rendezvous_client::{CallClient, CallState, ClientConfig, MediaConnectionState};
use rendezvous_core::{RoomId, RoomRef, StorePath};
use rendezvous_server::MemoryStore;
use tracing::Level;

use super::{MockEngineFactory, MockMediaEngine, RecordingStore, eventually, wait_for_state};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Short timeouts so failure paths finish quickly.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        match_timeout: Duration::from_secs(5),
        offer_wait: Duration::from_secs(2),
        negotiation_timeout: Duration::from_secs(5),
        teardown_write_timeout: Duration::from_millis(500),
        ..ClientConfig::default()
    }
}

pub fn room_ref(config: &ClientConfig, id: &RoomId) -> RoomRef {
    RoomRef::new(&config.rooms_path, id.clone())
}

pub fn rooms_path() -> StorePath {
    ClientConfig::default().rooms_path
}

/// A `CallClient` wired to mock media and its own recording view of a shared store.
pub struct Participant {
    pub client: CallClient,
    pub store: Arc<RecordingStore>,
    pub engines: Arc<MockEngineFactory>,
    pub config: ClientConfig,
}

impl Participant {
    pub fn new(name: &str, shared: &MemoryStore) -> Self {
        Self::with_config(name, shared, test_config())
    }

    pub fn with_config(name: &str, shared: &MemoryStore, config: ClientConfig) -> Self {
        Self::with_factory(shared, config, MockEngineFactory::new(name))
    }

    pub fn with_factory(
        shared: &MemoryStore,
        config: ClientConfig,
        engines: Arc<MockEngineFactory>,
    ) -> Self {
        let store = Arc::new(RecordingStore::new(shared.clone()));
        let client = CallClient::new(store.clone(), engines.clone(), config.clone());
        Self {
            client,
            store,
            engines,
            config,
        }
    }

    pub fn engine(&self) -> Arc<MockMediaEngine> {
        self.engines.last()
    }

    /// The room of the live session. Panics when there is none.
    pub fn room(&self) -> RoomRef {
        let id = self.client.room_id().expect("participant has no room");
        room_ref(&self.config, &id)
    }

    pub async fn wait_for(&self, state: CallState) {
        let mut rx = self.client.subscribe();
        wait_for_state(&mut rx, |s| s.state == state).await;
    }

    /// Wait until the session has registered its engine callbacks.
    pub async fn wait_attached(&self) {
        let engine = self.engine();
        eventually("engine callbacks attached", || {
            let engine = Arc::clone(&engine);
            async move { engine.is_attached() }
        })
        .await;
    }
}

/// Join `a` then `b`, run the offer/answer exchange and report both engines connected.
pub async fn connect_pair(a: &Participant, b: &Participant) {
    a.client.join().await.expect("first join failed");
    a.wait_attached().await;
    b.client.join().await.expect("second join failed");
    b.wait_attached().await;

    let (engine_a, engine_b) = (a.engine(), b.engine());
    eventually("answer applied by the caller", || {
        let engine = Arc::clone(&engine_a);
        async move { engine.remote_description().is_some() }
    })
    .await;
    eventually("offer applied by the callee", || {
        let engine = Arc::clone(&engine_b);
        async move { engine.remote_description().is_some() }
    })
    .await;

    engine_a.emit_state(MediaConnectionState::Connected);
    engine_b.emit_state(MediaConnectionState::Connected);
    a.wait_for(CallState::Connected).await;
    b.wait_for(CallState::Connected).await;
}
