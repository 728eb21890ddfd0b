use crate::model::StorePath;
use crate::store::StoreError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshots of a single key: `None` while the key is absent.
pub type ValueStream = BoxStream<'static, Option<Value>>;

/// `(generated key, value)` for every child of a list, existing ones first.
pub type ChildStream = BoxStream<'static, (String, Value)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CasOutcome {
    Committed,
    /// The key no longer held the expected value; `current` is what it held instead.
    Aborted { current: Option<Value> },
}

impl CasOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CasOutcome::Committed)
    }
}

/// The shared key-value tree both participants coordinate through.
///
/// Writing `Value::Null` is the same as removing the key. Subscriptions stay open until the
/// returned stream is dropped; dropping and subscribing again restarts from a fresh snapshot.
#[async_trait]
pub trait SignalingStore: Send + Sync {
    async fn set_value(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Atomically replace the value at `path` only if it currently equals `expected`.
    /// `new_value = None` removes the key on commit.
    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new_value: Option<Value>,
    ) -> Result<CasOutcome, StoreError>;

    async fn get_value(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Append under `path` with a store generated key. Keys sort in generation order.
    async fn push_child(&self, path: &StorePath, value: Value) -> Result<String, StoreError>;

    async fn remove_value(&self, path: &StorePath) -> Result<(), StoreError>;

    /// First child of `path` (in key order) whose `child` field equals `equals`.
    async fn query_first_child(
        &self,
        path: &StorePath,
        child: &str,
        equals: &Value,
    ) -> Result<Option<(String, Value)>, StoreError>;

    async fn subscribe_value(&self, path: &StorePath) -> Result<ValueStream, StoreError>;

    async fn subscribe_child_added(&self, path: &StorePath) -> Result<ChildStream, StoreError>;
}
