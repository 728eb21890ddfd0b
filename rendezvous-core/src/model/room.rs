use crate::model::signaling::{CandidateRecord, NegotiationRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Room identifier: the key the store generated when the room was pushed under `rooms/`.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Matched,
    Disconnected,
}

impl RoomStatus {
    /// Status only ever moves forward: `Waiting -> Matched -> Disconnected`.
    /// `Waiting -> Disconnected` is allowed (a subsequence of the same order).
    pub fn can_advance_to(self, next: RoomStatus) -> bool {
        self.rank() < next.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Matched => "matched",
            RoomStatus::Disconnected => "disconnected",
        }
    }

    pub fn to_value(self) -> serde_json::Value {
        serde_json::Value::String(self.as_str().to_owned())
    }

    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value.as_str()? {
            "waiting" => Some(RoomStatus::Waiting),
            "matched" => Some(RoomStatus::Matched),
            "disconnected" => Some(RoomStatus::Disconnected),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            RoomStatus::Waiting => 0,
            RoomStatus::Matched => 1,
            RoomStatus::Disconnected => 2,
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full snapshot of `rooms/{id}` as laid out in the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub status: RoomStatus,
    /// Unix milliseconds, assigned by the store.
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<NegotiationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<NegotiationRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub caller_candidates: BTreeMap<String, CandidateRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub callee_candidates: BTreeMap<String, CandidateRecord>,
}
