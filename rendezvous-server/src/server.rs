use crate::config::ServerConfig;
use crate::service::{StoreService, ws_handler};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: StoreService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(service)
}

async fn health(State(service): State<StoreService>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": service.connection_count(),
    }))
}

/// Store server bound to a TCP listener but not yet accepting connections.
pub struct StoreServer {
    listener: TcpListener,
    service: StoreService,
}

impl StoreServer {
    pub async fn bind(config: &ServerConfig, service: StoreService) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bind).await?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn service(&self) -> &StoreService {
        &self.service
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!("Signaling store listening on ws://{}/ws", self.local_addr()?);
        axum::serve(self.listener, router(self.service)).await?;
        Ok(())
    }
}

/// Bind and serve until the process ends.
pub async fn serve(config: ServerConfig, service: StoreService) -> anyhow::Result<()> {
    StoreServer::bind(&config, service).await?.run().await
}
