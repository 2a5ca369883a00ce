mod client;
mod mount_registry;
mod mounted_toggle;

pub use client::*;
pub use mount_registry::*;
pub use mounted_toggle::*;
