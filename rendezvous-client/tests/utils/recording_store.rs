use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use std::future::Future;

use async_trait::async_trait;
use futures::StreamExt;
use rendezvous_core::{
    CasOutcome, ChildStream, SignalingStore, StoreError, StorePath, ValueStream,
};
use rendezvous_server::MemoryStore;
use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Set,
    CompareAndSet,
    Push,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub op: WriteOp,
    pub path: String,
    pub value: Option<Value>,
}

/// One participant's view of a shared `MemoryStore`, recording that participant's writes.
pub struct RecordingStore {
    inner: MemoryStore,
    writes: Mutex<Vec<RecordedWrite>>,
    unavailable: AtomicBool,
    severed: watch::Sender<bool>,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            severed: watch::Sender::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// End every open subscription stream, as a dropped store connection does.
    pub fn sever_subscriptions(&self) {
        self.severed.send_replace(true);
    }

    fn until_severed(&self) -> impl Future<Output = ()> + Send + use<> {
        let mut severed = self.severed.subscribe();
        async move {
            let _ = severed.wait_for(|s| *s).await;
        }
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Plain `set` writes of `value` to any room's `status`.
    pub fn status_writes(&self, value: &str) -> usize {
        self.writes()
            .iter()
            .filter(|w| {
                w.op == WriteOp::Set
                    && w.path.ends_with("/status")
                    && w.value.as_ref().and_then(Value::as_str) == Some(value)
            })
            .count()
    }

    fn record(&self, op: WriteOp, path: &StorePath, value: Option<Value>) {
        self.writes.lock().unwrap().push(RecordedWrite {
            op,
            path: path.as_str().to_owned(),
            value,
        });
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl SignalingStore for RecordingStore {
    async fn set_value(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.check()?;
        self.record(WriteOp::Set, path, Some(value.clone()));
        self.inner.set_value(path, value).await
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new_value: Option<Value>,
    ) -> Result<CasOutcome, StoreError> {
        self.check()?;
        self.record(WriteOp::CompareAndSet, path, new_value.clone());
        self.inner.compare_and_set(path, expected, new_value).await
    }

    async fn get_value(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.check()?;
        self.inner.get_value(path).await
    }

    async fn push_child(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        self.check()?;
        self.record(WriteOp::Push, path, Some(value.clone()));
        self.inner.push_child(path, value).await
    }

    async fn remove_value(&self, path: &StorePath) -> Result<(), StoreError> {
        self.check()?;
        self.record(WriteOp::Remove, path, None);
        self.inner.remove_value(path).await
    }

    async fn query_first_child(
        &self,
        path: &StorePath,
        child: &str,
        equals: &Value,
    ) -> Result<Option<(String, Value)>, StoreError> {
        self.check()?;
        self.inner.query_first_child(path, child, equals).await
    }

    async fn subscribe_value(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
        self.check()?;
        let updates = self.inner.subscribe_value(path).await?;
        Ok(updates.take_until(self.until_severed()).boxed())
    }

    async fn subscribe_child_added(&self, path: &StorePath) -> Result<ChildStream, StoreError> {
        self.check()?;
        let added = self.inner.subscribe_child_added(path).await?;
        Ok(added.take_until(self.until_severed()).boxed())
    }
}
