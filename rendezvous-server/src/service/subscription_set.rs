use rendezvous_core::RequestId;
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Forwarding tasks owned by one WebSocket connection. Dropping the set cancels them all.
#[derive(Default)]
pub(crate) struct SubscriptionSet {
    tasks: HashMap<RequestId, JoinHandle<()>>,
}

impl SubscriptionSet {
    pub(crate) fn insert(&mut self, id: RequestId, task: JoinHandle<()>) {
        if let Some(previous) = self.tasks.insert(id, task) {
            previous.abort();
        }
    }

    pub(crate) fn cancel(&mut self, id: RequestId) -> bool {
        match self.tasks.remove(&id) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
