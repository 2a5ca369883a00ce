use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Relation toggles and live conversations behind a local HTTP API")]
pub struct Cli {
    /// Path to a settings TOML file.
    #[arg(long)]
    pub settings: Option<String>,
}
