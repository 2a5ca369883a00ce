mod conversation_service;
mod error_sink;
mod push_service;
mod relationship_service;

pub use conversation_service::*;
pub use error_sink::*;
pub use push_service::*;
pub use relationship_service::*;
