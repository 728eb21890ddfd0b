use crate::error::RendezvousError;
use rendezvous_core::{Role, RoomId};
use std::fmt;

/// What the UI shows for the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    Idle,
    Waiting,
    Matched,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallState::Disconnected | CallState::Failed | CallState::Closed
        )
    }

    /// States only move forward within one session; terminal states are final.
    pub fn can_advance_to(self, next: CallState) -> bool {
        self.rank() < next.rank()
    }

    fn rank(self) -> u8 {
        match self {
            CallState::Idle => 0,
            CallState::Waiting => 1,
            CallState::Matched => 2,
            CallState::Negotiating => 3,
            CallState::Connected => 4,
            CallState::Disconnected | CallState::Failed | CallState::Closed => 5,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Waiting => "waiting",
            CallState::Matched => "matched",
            CallState::Negotiating => "negotiating",
            CallState::Connected => "connected",
            CallState::Disconnected => "disconnected",
            CallState::Failed => "failed",
            CallState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndReason {
    LocalHangUp,
    PeerDisconnected,
    RoomRemoved,
    MalformedSignalingRecord,
    NegotiationFailed,
    MediaDisconnected,
    MediaFailed,
    MediaClosed,
    Timeout,
    StoreUnavailable,
    AppTeardown,
}

impl EndReason {
    pub fn terminal_state(self) -> CallState {
        match self {
            EndReason::LocalHangUp
            | EndReason::AppTeardown
            | EndReason::RoomRemoved
            | EndReason::MediaClosed => CallState::Closed,
            EndReason::PeerDisconnected | EndReason::MediaDisconnected => CallState::Disconnected,
            EndReason::MalformedSignalingRecord
            | EndReason::NegotiationFailed
            | EndReason::MediaFailed
            | EndReason::Timeout
            | EndReason::StoreUnavailable => CallState::Failed,
        }
    }
}

impl From<&RendezvousError> for EndReason {
    fn from(err: &RendezvousError) -> Self {
        match err {
            RendezvousError::StoreUnavailable(_) => EndReason::StoreUnavailable,
            RendezvousError::MalformedSignalingRecord(_) => EndReason::MalformedSignalingRecord,
            RendezvousError::PeerDisconnected => EndReason::PeerDisconnected,
            RendezvousError::Timeout(..) => EndReason::Timeout,
            RendezvousError::RoomRaceLost
            | RendezvousError::MediaEngineInitFailure(_)
            | RendezvousError::Negotiation(_)
            | RendezvousError::SessionActive => EndReason::NegotiationFailed,
        }
    }
}

/// Published to UI subscribers on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub state: CallState,
    pub room_id: Option<RoomId>,
    pub role: Option<Role>,
    pub reason: Option<EndReason>,
}

impl LifecycleSnapshot {
    pub fn idle() -> Self {
        Self {
            state: CallState::Idle,
            room_id: None,
            role: None,
            reason: None,
        }
    }

    pub fn ended(reason: EndReason) -> Self {
        Self {
            state: reason.terminal_state(),
            room_id: None,
            role: None,
            reason: Some(reason),
        }
    }
}

impl Default for LifecycleSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
