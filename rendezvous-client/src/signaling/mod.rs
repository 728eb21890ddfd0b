mod session_event;
mod signaling_exchange;

pub use session_event::*;
pub use signaling_exchange::*;
