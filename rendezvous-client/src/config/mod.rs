mod client_config;
mod media_config;

pub use client_config::*;
pub use media_config::*;
