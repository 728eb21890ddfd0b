mod client;
mod config;
mod error;
mod lifecycle;
mod matchmaking;
mod media;
mod signaling;
mod store;

pub use client::*;
pub use config::*;
pub use error::*;
pub use lifecycle::*;
pub use matchmaking::*;
pub use media::*;
pub use signaling::*;
pub use store::*;
