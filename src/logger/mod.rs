//! Process-wide tracing setup. Library code only uses the re-exported macros;
//! installing the subscriber is left to binaries.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
