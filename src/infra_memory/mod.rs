//! In-process backends. Used by the `fake` settings and by tests.

mod push_hub;
mod remote_store;

pub use push_hub::*;
pub use remote_store::*;
