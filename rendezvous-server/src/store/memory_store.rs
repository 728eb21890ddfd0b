use crate::store::push_keys::PushKeys;
use crate::store::tree;
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use rendezvous_core::{
    CasOutcome, ChildStream, SignalingStore, StoreError, StorePath, ValueStream,
};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, trace};

enum Watch {
    Value {
        last: Option<Value>,
        tx: mpsc::UnboundedSender<Option<Value>>,
    },
    ChildAdded {
        seen: BTreeSet<String>,
        tx: mpsc::UnboundedSender<(String, Value)>,
    },
}

struct Watcher {
    path: StorePath,
    watch: Watch,
}

impl Watcher {
    fn is_closed(&self) -> bool {
        match &self.watch {
            Watch::Value { tx, .. } => tx.is_closed(),
            Watch::ChildAdded { tx, .. } => tx.is_closed(),
        }
    }

    /// Emit whatever changed at this watcher's path since it last looked.
    fn refresh(&mut self, root: &Value) {
        match &mut self.watch {
            Watch::Value { last, tx } => {
                let current = tree::lookup(root, &self.path).cloned();
                if current != *last {
                    let _ = tx.unbounded_send(current.clone());
                    *last = current;
                }
            }
            Watch::ChildAdded { seen, tx } => {
                let children = tree::lookup(root, &self.path).and_then(Value::as_object);
                let Some(children) = children else {
                    seen.clear();
                    return;
                };
                for (key, value) in children {
                    if seen.insert(key.clone()) {
                        let _ = tx.unbounded_send((key.clone(), value.clone()));
                    }
                }
                seen.retain(|key| children.contains_key(key));
            }
        }
    }
}

struct TreeState {
    root: Value,
    watchers: Vec<Watcher>,
    push_keys: PushKeys,
}

impl TreeState {
    fn apply(&mut self, path: &StorePath, value: Option<Value>) {
        tree::write(&mut self.root, path, value);

        let TreeState { root, watchers, .. } = self;
        for watcher in watchers.iter_mut() {
            if tree::overlaps(&watcher.path, path) {
                watcher.refresh(root);
            }
        }
        watchers.retain(|w| !w.is_closed());
    }
}

/// In-process signaling store.
///
/// All writes go through one lock and subscription events are emitted while it is held, so
/// every subscriber sees changes to a key (or appends to a list) in commit order.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<TreeState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TreeState {
                root: Value::Object(Map::new()),
                watchers: Vec::new(),
                push_keys: PushKeys::default(),
            })),
        }
    }

    /// Copy of the whole tree.
    pub async fn dump(&self) -> Value {
        self.state.lock().await.root.clone()
    }

    /// Number of live subscriptions, pruning the ones whose stream was dropped.
    pub async fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.watchers.retain(|w| !w.is_closed());
        state.watchers.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[async_trait]
impl SignalingStore for MemoryStore {
    async fn set_value(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        trace!(%path, "set");
        let value = tree::normalize(value, now_ms());
        self.state.lock().await.apply(path, value);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        path: &StorePath,
        expected: Option<Value>,
        new_value: Option<Value>,
    ) -> Result<CasOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let current = tree::lookup(&state.root, path).cloned();

        if current != expected {
            debug!(%path, ?current, ?expected, "conditional write aborted");
            return Ok(CasOutcome::Aborted { current });
        }

        let value = new_value.and_then(|v| tree::normalize(v, now_ms()));
        state.apply(path, value);
        Ok(CasOutcome::Committed)
    }

    async fn get_value(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let state = self.state.lock().await;
        Ok(tree::lookup(&state.root, path).cloned())
    }

    async fn push_child(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let now = now_ms();
        let mut state = self.state.lock().await;
        let key = state.push_keys.next(now);
        let value = tree::normalize(value, now);
        state.apply(&path.child(&key), value);
        trace!(%path, %key, "push");
        Ok(key)
    }

    async fn remove_value(&self, path: &StorePath) -> Result<(), StoreError> {
        trace!(%path, "remove");
        self.state.lock().await.apply(path, None);
        Ok(())
    }

    async fn query_first_child(
        &self,
        path: &StorePath,
        child: &str,
        equals: &Value,
    ) -> Result<Option<(String, Value)>, StoreError> {
        let state = self.state.lock().await;
        let Some(children) = tree::lookup(&state.root, path).and_then(Value::as_object) else {
            return Ok(None);
        };

        Ok(children
            .iter()
            .find(|(_, v)| v.get(child) == Some(equals))
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    async fn subscribe_value(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
        let (tx, rx) = mpsc::unbounded();
        let mut state = self.state.lock().await;

        let current = tree::lookup(&state.root, path).cloned();
        let _ = tx.unbounded_send(current.clone());
        state.watchers.push(Watcher {
            path: path.clone(),
            watch: Watch::Value { last: current, tx },
        });

        Ok(rx.boxed())
    }

    async fn subscribe_child_added(&self, path: &StorePath) -> Result<ChildStream, StoreError> {
        let (tx, rx) = mpsc::unbounded();
        let mut state = self.state.lock().await;

        let mut watcher = Watcher {
            path: path.clone(),
            watch: Watch::ChildAdded {
                seen: BTreeSet::new(),
                tx,
            },
        };
        watcher.refresh(&state.root);
        state.watchers.push(watcher);

        Ok(rx.boxed())
    }
}
