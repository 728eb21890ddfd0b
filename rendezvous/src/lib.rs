pub use rendezvous_core::{Role, RoomId, RoomStatus, SignalingStore, StoreError};

pub mod model {
    pub use rendezvous_core::model::*;
}

pub mod protocol {
    pub use rendezvous_core::protocol::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use rendezvous_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use rendezvous_client::*;
}
