mod store_service;
mod subscription_set;
mod ws_handler;

pub use store_service::*;
pub use ws_handler::*;
