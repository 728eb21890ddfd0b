use crate::model::role::Role;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Key of the sentinel object the store replaces with its own clock.
pub const SERVER_TIMESTAMP_KEY: &str = ".sv";

/// Placeholder resolved by the store to Unix milliseconds at write time.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: "timestamp" })
}

/// Slash separated location in the store tree, e.g. `rooms/-Nx1/status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePath(String);

impl StorePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    pub fn child(&self, segment: impl AsRef<str>) -> Self {
        if self.0.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{}", self.0, segment.as_ref()))
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StorePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Handle to one room in the store, resolving the fixed record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRef {
    pub id: RoomId,
    path: StorePath,
}

impl RoomRef {
    pub fn new(rooms: &StorePath, id: RoomId) -> Self {
        let path = rooms.child(id.as_str());
        Self { id, path }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    pub fn status(&self) -> StorePath {
        self.path.child("status")
    }

    pub fn created(&self) -> StorePath {
        self.path.child("created")
    }

    pub fn offer(&self) -> StorePath {
        self.path.child("offer")
    }

    pub fn answer(&self) -> StorePath {
        self.path.child("answer")
    }

    pub fn local_candidates(&self, role: Role) -> StorePath {
        self.path.child(role.local_candidates_key())
    }

    pub fn remote_candidates(&self, role: Role) -> StorePath {
        self.path.child(role.remote_candidates_key())
    }
}
