use crate::service::subscription_set::SubscriptionSet;
use crate::store::MemoryStore;
use axum::extract::ws::Message;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use rendezvous_core::{CasOutcome, RequestId, SignalingStore, StoreRequest, StoreResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub type ConnectionId = u64;

struct StoreServiceInner {
    store: MemoryStore,
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    next_connection: AtomicU64,
}

/// Serves one `MemoryStore` to any number of WebSocket connections.
#[derive(Clone)]
pub struct StoreService {
    inner: Arc<StoreServiceInner>,
}

impl StoreService {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(StoreServiceInner {
                store,
                connections: DashMap::new(),
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.inner.store
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub(crate) fn add_connection(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = self.inner.next_connection.fetch_add(1, Ordering::Relaxed);
        self.inner.connections.insert(id, tx);
        id
    }

    pub(crate) fn remove_connection(&self, id: ConnectionId) {
        self.inner.connections.remove(&id);
    }

    /// Run one request against the store and queue the reply (and, for subscriptions, the
    /// event forwarder) on the connection.
    pub(crate) async fn execute(
        &self,
        conn: ConnectionId,
        request: StoreRequest,
        subscriptions: &mut SubscriptionSet,
    ) {
        let id = request.id();
        let store = &self.inner.store;

        let reply = match request {
            StoreRequest::Set { path, value, .. } => store
                .set_value(&path, value)
                .await
                .map(|_| StoreResponse::Ack { id }),

            StoreRequest::CompareAndSet {
                path,
                expected,
                value,
                ..
            } => store
                .compare_and_set(&path, expected, value)
                .await
                .map(|outcome| match outcome {
                    CasOutcome::Committed => StoreResponse::Committed { id },
                    CasOutcome::Aborted { current } => StoreResponse::Aborted { id, current },
                }),

            StoreRequest::Get { path, .. } => store
                .get_value(&path)
                .await
                .map(|value| StoreResponse::Snapshot { id, value }),

            StoreRequest::Push { path, value, .. } => store
                .push_child(&path, value)
                .await
                .map(|key| StoreResponse::Pushed { id, key }),

            StoreRequest::Remove { path, .. } => store
                .remove_value(&path)
                .await
                .map(|_| StoreResponse::Ack { id }),

            StoreRequest::QueryFirst {
                path,
                child,
                equals,
                ..
            } => store
                .query_first_child(&path, &child, &equals)
                .await
                .map(|found| {
                    let (key, value) = found.unzip();
                    StoreResponse::QueryResult { id, key, value }
                }),

            StoreRequest::SubscribeValue { path, .. } => match store.subscribe_value(&path).await {
                Ok(stream) => {
                    self.send_frame(conn, StoreResponse::Subscribed { id });
                    let events = stream.map(move |value| StoreResponse::ValueChanged { sub: id, value });
                    subscriptions.insert(id, self.spawn_forwarder(conn, events));
                    debug!(conn, id, %path, "value subscription opened");
                    return;
                }
                Err(e) => Err(e),
            },

            StoreRequest::SubscribeChildAdded { path, .. } => {
                match store.subscribe_child_added(&path).await {
                    Ok(stream) => {
                        self.send_frame(conn, StoreResponse::Subscribed { id });
                        let events = stream
                            .map(move |(key, value)| StoreResponse::ChildAdded { sub: id, key, value });
                        subscriptions.insert(id, self.spawn_forwarder(conn, events));
                        debug!(conn, id, %path, "child subscription opened");
                        return;
                    }
                    Err(e) => Err(e),
                }
            }

            StoreRequest::Unsubscribe { id } => {
                if !subscriptions.cancel(id) {
                    warn!(conn, id, "unsubscribe for unknown subscription");
                }
                Ok(StoreResponse::Ack { id })
            }
        };

        let frame = reply.unwrap_or_else(|e| StoreResponse::Error {
            id,
            message: e.to_string(),
        });
        self.send_frame(conn, frame);
    }

    fn spawn_forwarder<S>(&self, conn: ConnectionId, mut events: S) -> tokio::task::JoinHandle<()>
    where
        S: Stream<Item = StoreResponse> + Send + Unpin + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = events.next().await {
                if !service.send_frame(conn, frame) {
                    break;
                }
            }
        })
    }

    /// Serialize and queue a frame. Returns false once the connection is gone.
    pub(crate) fn send_frame(&self, conn: ConnectionId, frame: StoreResponse) -> bool {
        let Some(tx) = self.inner.connections.get(&conn) else {
            warn!(conn, "attempted to send to closed connection");
            return false;
        };

        match serde_json::to_string(&frame) {
            Ok(json) => {
                if let Err(e) = tx.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {}: {:?}", conn, e);
                    return false;
                }
                true
            }
            Err(e) => {
                error!("Failed to serialize store frame: {}", e);
                true
            }
        }
    }
}
