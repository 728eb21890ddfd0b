use anyhow::Result;
use async_trait::async_trait;
use rendezvous_core::{CandidateRecord, NegotiationRecord};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for MediaConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaConnectionState::New => "new",
            MediaConnectionState::Connecting => "connecting",
            MediaConnectionState::Connected => "connected",
            MediaConnectionState::Disconnected => "disconnected",
            MediaConnectionState::Failed => "failed",
            MediaConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

pub type LocalCandidateHandler = Box<dyn Fn(CandidateRecord) + Send + Sync>;
pub type ConnectionStateHandler = Box<dyn Fn(MediaConnectionState) + Send + Sync>;

/// Session negotiation primitives of the underlying media stack.
///
/// Remote candidates may be added before the remote description is set; implementations
/// buffer them until they can be applied.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Produce a local offer payload. Does not apply it.
    async fn create_offer(&self) -> Result<String>;

    /// Produce a local answer payload for the remote offer already applied.
    async fn create_answer(&self) -> Result<String>;

    async fn set_local_description(&self, record: &NegotiationRecord) -> Result<()>;

    async fn set_remote_description(&self, record: &NegotiationRecord) -> Result<()>;

    async fn add_candidate(&self, record: &CandidateRecord) -> Result<()>;

    /// Replaces any previously registered handler.
    fn on_local_candidate(&self, handler: LocalCandidateHandler);

    /// Replaces any previously registered handler.
    fn on_connection_state_change(&self, handler: ConnectionStateHandler);

    async fn close(&self) -> Result<()>;
}

/// Builds one engine per call; a closed engine is never reused.
#[async_trait]
pub trait MediaEngineFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn MediaEngine>>;
}
