mod call_client;

pub use call_client::*;
