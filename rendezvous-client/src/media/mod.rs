mod media_engine;
mod webrtc_engine;

pub use media_engine::*;
pub use webrtc_engine::*;
