// remote store

mod message_store;
mod relation_store;

pub use message_store::*;
pub use relation_store::*;

// change feed

mod push_channel;

pub use push_channel::*;
