#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    #[error("malformed change payload: {0}")]
    Malformed(String),
}
