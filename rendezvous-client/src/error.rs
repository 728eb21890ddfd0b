use rendezvous_core::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RendezvousError {
    #[error("signaling store unavailable: {0}")]
    StoreUnavailable(String),

    /// Another participant claimed the room first. Matchmaking retries internally.
    #[error("room was claimed by another participant")]
    RoomRaceLost,

    #[error("malformed signaling record: {0}")]
    MalformedSignalingRecord(String),

    #[error("media engine failed to initialize: {0}")]
    MediaEngineInitFailure(String),

    #[error("peer disconnected")]
    PeerDisconnected,

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    #[error("a call session is already active")]
    SessionActive,
}

impl From<StoreError> for RendezvousError {
    fn from(err: StoreError) -> Self {
        RendezvousError::StoreUnavailable(err.to_string())
    }
}

impl RendezvousError {
    pub(crate) fn malformed(what: impl std::fmt::Display) -> Self {
        RendezvousError::MalformedSignalingRecord(what.to_string())
    }

    pub(crate) fn negotiation(err: anyhow::Error) -> Self {
        RendezvousError::Negotiation(format!("{err:#}"))
    }
}
