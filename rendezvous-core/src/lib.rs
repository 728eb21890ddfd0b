pub mod model;
pub mod protocol;
pub mod store;

pub use model::*;
pub use protocol::*;
pub use store::*;
