use std::net::SocketAddr;

use rendezvous_server::{MemoryStore, ServerConfig, StoreServer, StoreService};
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a store server on an ephemeral port. The returned service shares the server's store.
pub async fn spawn_server() -> (SocketAddr, StoreService) {
    let config = ServerConfig::default().with_bind(SocketAddr::from(([127, 0, 0, 1], 0)));
    let service = StoreService::new(MemoryStore::new());
    let server = StoreServer::bind(&config, service.clone())
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr().expect("No local addr");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, service)
}
