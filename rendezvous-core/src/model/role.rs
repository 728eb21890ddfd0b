use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the call this participant plays. Fixed for the lifetime of a room.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Created the room and writes the offer.
    Caller,
    /// Claimed a waiting room and writes the answer.
    Callee,
}

impl Role {
    /// Candidate list this role appends to.
    pub fn local_candidates_key(self) -> &'static str {
        match self {
            Role::Caller => "callerCandidates",
            Role::Callee => "calleeCandidates",
        }
    }

    /// Candidate list written by the other side.
    pub fn remote_candidates_key(self) -> &'static str {
        self.peer().local_candidates_key()
    }

    pub fn peer(self) -> Role {
        match self {
            Role::Caller => Role::Callee,
            Role::Callee => Role::Caller,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Caller => f.write_str("caller"),
            Role::Callee => f.write_str("callee"),
        }
    }
}
