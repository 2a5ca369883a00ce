//! Settings are read from a TOML file chosen by build profile, or from the
//! path given with `--settings`.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
