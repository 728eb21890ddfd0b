mod store_message;

pub use store_message::*;
