mod memory_store;
mod push_keys;
mod tree;

pub use memory_store::*;
