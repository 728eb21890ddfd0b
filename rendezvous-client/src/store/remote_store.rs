use async_trait::async_trait;
use dashmap::DashMap;
use futures::channel::mpsc as event_channel;
use futures::{SinkExt, StreamExt, future};
use rendezvous_core::{
    CasOutcome, ChildStream, RequestId, SignalingStore, StoreError, StorePath, StoreRequest,
    StoreResponse, ValueStream,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

struct RemoteInner {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: DashMap<RequestId, oneshot::Sender<StoreResponse>>,
    subscriptions: DashMap<RequestId, event_channel::UnboundedSender<StoreResponse>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    request_timeout: Duration,
}

impl RemoteInner {
    fn send_frame(&self, request: &StoreRequest) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::unavailable("connection closed"));
        }
        let json =
            serde_json::to_string(request).map_err(|e| StoreError::Protocol(e.to_string()))?;
        self.outgoing
            .send(Message::Text(json.into()))
            .map_err(|_| StoreError::unavailable("connection closed"))
    }

    fn dispatch(&self, frame: StoreResponse) {
        match frame {
            StoreResponse::ValueChanged { sub, .. } | StoreResponse::ChildAdded { sub, .. } => {
                if let Some(tx) = self.subscriptions.get(&sub) {
                    let _ = tx.unbounded_send(frame);
                }
            }
            other => {
                let Some(id) = other.reply_to() else { return };
                match self.pending.remove(&id) {
                    Some((_, tx)) => {
                        let _ = tx.send(other);
                    }
                    None if matches!(other, StoreResponse::Error { .. }) => {
                        warn!(id, "store error without a pending request: {:?}", other);
                    }
                    None => {}
                }
            }
        }
    }

    fn shut_down(&self) {
        self.closed.store(true, Ordering::Release);
        // Dropping the senders fails pending requests and ends subscription streams.
        self.pending.clear();
        self.subscriptions.clear();
    }
}

/// Removes the subscription and tells the server when its stream is dropped.
struct SubscriptionGuard {
    id: RequestId,
    inner: Arc<RemoteInner>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.inner.subscriptions.remove(&self.id);
        if !self.inner.closed.load(Ordering::Acquire) {
            let _ = self.inner.send_frame(&StoreRequest::Unsubscribe { id: self.id });
        }
    }
}

/// `SignalingStore` served by a remote store server over WebSocket.
pub struct RemoteStore {
    inner: Arc<RemoteInner>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RemoteStore {
    /// Connect to `ws://host/ws`.
    pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self, StoreError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| StoreError::unavailable(format!("connect {url}: {e}")))?;
        info!("Connected to signaling store at {}", url);
        Ok(Self::from_stream(ws_stream, request_timeout))
    }

    fn from_stream(
        ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        request_timeout: Duration,
    ) -> Self {
        let (mut sink, mut stream) = ws_stream.split();
        let (outgoing, mut rx) = mpsc::unbounded_channel::<Message>();

        let inner = Arc::new(RemoteInner {
            outgoing,
            pending: DashMap::new(),
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            request_timeout,
        });

        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn({
            let inner = Arc::clone(&inner);
            async move {
                while let Some(Ok(msg)) = stream.next().await {
                    match msg {
                        Message::Text(text) => match serde_json::from_str::<StoreResponse>(&text) {
                            Ok(frame) => inner.dispatch(frame),
                            Err(e) => warn!("Invalid StoreResponse: {:?}", e),
                        },
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                debug!("store connection closed");
                inner.shut_down();
            }
        });

        Self {
            inner,
            reader,
            writer,
        }
    }

    fn next_id(&self) -> RequestId {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a request and wait for the frame that answers it.
    async fn request(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let id = request.id();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(id, tx);

        if let Err(e) = self.inner.send_frame(&request) {
            self.inner.pending.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.inner.request_timeout, rx).await {
            Ok(Ok(StoreResponse::Error { message, .. })) => Err(StoreError::Protocol(message)),
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(StoreError::unavailable("connection closed")),
            Err(_) => {
                self.inner.pending.remove(&id);
                Err(StoreError::unavailable(format!(
                    "request {id} timed out after {:?}",
                    self.inner.request_timeout
                )))
            }
        }
    }

    /// Register the event sink before sending so no event can outrun it.
    async fn subscribe(
        &self,
        request: StoreRequest,
    ) -> Result<(SubscriptionGuard, event_channel::UnboundedReceiver<StoreResponse>), StoreError>
    {
        let id = request.id();
        let (tx, rx) = event_channel::unbounded();
        self.inner.subscriptions.insert(id, tx);
        let guard = SubscriptionGuard {
            id,
            inner: Arc::clone(&self.inner),
        };

        match self.request(request).await? {
            StoreResponse::Subscribed { .. } => Ok((guard, rx)),
            other => Err(unexpected(other)),
        }
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.inner.shut_down();
    }
}

fn unexpected(frame: StoreResponse) -> StoreError {
    StoreError::Protocol(format!("unexpected reply {frame:?}"))
}

#[async_trait]
impl SignalingStore for RemoteStore {
    async fn set_value(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let request = StoreRequest::Set {
            id: self.next_id(),
            path: path.clone(),
            value,
        };
        match self.request(request).await? {
            StoreResponse::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new_value: Option<Value>,
    ) -> Result<CasOutcome, StoreError> {
        let request = StoreRequest::CompareAndSet {
            id: self.next_id(),
            path: path.clone(),
            expected,
            value: new_value,
        };
        match self.request(request).await? {
            StoreResponse::Committed { .. } => Ok(CasOutcome::Committed),
            StoreResponse::Aborted { current, .. } => Ok(CasOutcome::Aborted { current }),
            other => Err(unexpected(other)),
        }
    }

    async fn get_value(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let request = StoreRequest::Get {
            id: self.next_id(),
            path: path.clone(),
        };
        match self.request(request).await? {
            StoreResponse::Snapshot { value, .. } => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    async fn push_child(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let request = StoreRequest::Push {
            id: self.next_id(),
            path: path.clone(),
            value,
        };
        match self.request(request).await? {
            StoreResponse::Pushed { key, .. } => Ok(key),
            other => Err(unexpected(other)),
        }
    }

    async fn remove_value(&self, path: &StorePath) -> Result<(), StoreError> {
        let request = StoreRequest::Remove {
            id: self.next_id(),
            path: path.clone(),
        };
        match self.request(request).await? {
            StoreResponse::Ack { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn query_first_child(
        &self,
        path: &StorePath,
        child: &str,
        equals: &Value,
    ) -> Result<Option<(String, Value)>, StoreError> {
        let request = StoreRequest::QueryFirst {
            id: self.next_id(),
            path: path.clone(),
            child: child.to_owned(),
            equals: equals.clone(),
        };
        match self.request(request).await? {
            StoreResponse::QueryResult {
                key: Some(key),
                value: Some(value),
                ..
            } => Ok(Some((key, value))),
            StoreResponse::QueryResult { .. } => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    async fn subscribe_value(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
        let (guard, events) = self
            .subscribe(StoreRequest::SubscribeValue {
                id: self.next_id(),
                path: path.clone(),
            })
            .await?;

        Ok(events
            .filter_map(move |frame| {
                let _keep = &guard;
                future::ready(match frame {
                    StoreResponse::ValueChanged { value, .. } => Some(value),
                    _ => None,
                })
            })
            .boxed())
    }

    async fn subscribe_child_added(&self, path: &StorePath) -> Result<ChildStream, StoreError> {
        let (guard, events) = self
            .subscribe(StoreRequest::SubscribeChildAdded {
                id: self.next_id(),
                path: path.clone(),
            })
            .await?;

        Ok(events
            .filter_map(move |frame| {
                let _keep = &guard;
                future::ready(match frame {
                    StoreResponse::ChildAdded { key, value, .. } => Some((key, value)),
                    _ => None,
                })
            })
            .boxed())
    }
}
