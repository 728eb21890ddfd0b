mod call_state;
mod connection_lifecycle;
mod session;

pub use call_state::*;
pub use connection_lifecycle::*;
pub(crate) use session::*;
