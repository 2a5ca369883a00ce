mod error_sink_impl;
mod message_stream;
mod reconcile;
mod relation_capability_impl;
mod toggle_controller;

pub use error_sink_impl::*;
pub use message_stream::*;
pub use reconcile::*;
pub use relation_capability_impl::*;
pub use toggle_controller::*;
