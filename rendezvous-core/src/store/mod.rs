mod signaling_store;
mod store_error;

pub use signaling_store::*;
pub use store_error::*;
