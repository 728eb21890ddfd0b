mod layout;
mod role;
mod room;
mod signaling;

pub use layout::{RoomRef, SERVER_TIMESTAMP_KEY, StorePath, server_timestamp};
pub use role::Role;
pub use room::{RoomId, RoomRecord, RoomStatus};
pub use signaling::{CandidateRecord, IceServerConfig, NegotiationRecord, SdpKind};
