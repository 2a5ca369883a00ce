//! Remote store reached over a JSON HTTP API.

mod envelope;
mod remote_store_http;

pub use envelope::*;
pub use remote_store_http::*;
