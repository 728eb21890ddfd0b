mod room_matchmaker;

pub use room_matchmaker::*;
