mod config;
mod server;
mod service;
mod store;

pub use config::*;
pub use server::*;
pub use service::*;
pub use store::*;
