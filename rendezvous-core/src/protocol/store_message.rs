use crate::model::StorePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-chosen request id. Subscription events reuse the id of the request that opened them.
pub type RequestId = u64;

/// Frames a client sends to the store server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreRequest {
    Set {
        id: RequestId,
        path: StorePath,
        value: Value,
    },
    CompareAndSet {
        id: RequestId,
        path: StorePath,
        #[serde(default)]
        expected: Option<Value>,
        #[serde(default)]
        value: Option<Value>,
    },
    Get {
        id: RequestId,
        path: StorePath,
    },
    Push {
        id: RequestId,
        path: StorePath,
        value: Value,
    },
    Remove {
        id: RequestId,
        path: StorePath,
    },
    QueryFirst {
        id: RequestId,
        path: StorePath,
        child: String,
        equals: Value,
    },
    SubscribeValue {
        id: RequestId,
        path: StorePath,
    },
    SubscribeChildAdded {
        id: RequestId,
        path: StorePath,
    },
    Unsubscribe {
        id: RequestId,
    },
}

impl StoreRequest {
    pub fn id(&self) -> RequestId {
        match self {
            StoreRequest::Set { id, .. }
            | StoreRequest::CompareAndSet { id, .. }
            | StoreRequest::Get { id, .. }
            | StoreRequest::Push { id, .. }
            | StoreRequest::Remove { id, .. }
            | StoreRequest::QueryFirst { id, .. }
            | StoreRequest::SubscribeValue { id, .. }
            | StoreRequest::SubscribeChildAdded { id, .. }
            | StoreRequest::Unsubscribe { id } => *id,
        }
    }
}

/// Frames the store server sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum StoreResponse {
    Ack {
        id: RequestId,
    },
    Committed {
        id: RequestId,
    },
    Aborted {
        id: RequestId,
        #[serde(default)]
        current: Option<Value>,
    },
    Snapshot {
        id: RequestId,
        #[serde(default)]
        value: Option<Value>,
    },
    Pushed {
        id: RequestId,
        key: String,
    },
    QueryResult {
        id: RequestId,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        value: Option<Value>,
    },
    Subscribed {
        id: RequestId,
    },
    ValueChanged {
        sub: RequestId,
        #[serde(default)]
        value: Option<Value>,
    },
    ChildAdded {
        sub: RequestId,
        key: String,
        value: Value,
    },
    Error {
        id: RequestId,
        message: String,
    },
}

impl StoreResponse {
    /// Id of the request this frame answers; `None` for subscription events.
    pub fn reply_to(&self) -> Option<RequestId> {
        match self {
            StoreResponse::Ack { id }
            | StoreResponse::Committed { id }
            | StoreResponse::Aborted { id, .. }
            | StoreResponse::Snapshot { id, .. }
            | StoreResponse::Pushed { id, .. }
            | StoreResponse::QueryResult { id, .. }
            | StoreResponse::Subscribed { id }
            | StoreResponse::Error { id, .. } => Some(*id),
            StoreResponse::ValueChanged { .. } | StoreResponse::ChildAdded { .. } => None,
        }
    }
}
