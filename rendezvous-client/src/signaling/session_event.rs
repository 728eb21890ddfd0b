use crate::error::RendezvousError;
use crate::media::MediaConnectionState;
use rendezvous_core::{CandidateRecord, NegotiationRecord};

/// Everything a running session reacts to, from store subscriptions, media engine callbacks
/// and the owning `CallClient`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Room status became `matched`.
    RoomMatched,
    /// The peer wrote `status = disconnected`.
    PeerDisconnected,
    /// The room record disappeared.
    RoomRemoved,
    OfferReceived(NegotiationRecord),
    AnswerReceived(NegotiationRecord),
    CandidateReceived {
        key: String,
        candidate: CandidateRecord,
    },
    LocalCandidate(CandidateRecord),
    ConnectionStateChanged(MediaConnectionState),
    Malformed(String),
    /// A forwarder hit an error that ends the session.
    Failed(RendezvousError),
    LeaveRequested,
}
