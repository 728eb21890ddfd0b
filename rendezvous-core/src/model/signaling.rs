use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// `offer` / `answer` entry of a room. The payload is opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRecord {
    pub kind: SdpKind,
    pub payload: String,
}

impl NegotiationRecord {
    pub fn offer(payload: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            payload: payload.into(),
        }
    }

    pub fn answer(payload: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            payload: payload.into(),
        }
    }
}

/// One network-path candidate, appended under `callerCandidates` or `calleeCandidates`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub media_line_id: Option<String>,
    pub media_line_index: u16,
    pub payload: String,
}
