use crate::domain_model::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("message text is empty")]
    EmptyMessage,
    #[error("image uri is empty")]
    EmptyImageUri,
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),
    #[error("subscription failed: {0}")]
    Subscribe(String),
    #[error("remote call failed: {0}")]
    Remote(String),
}

impl ChatError {
    /// Validation errors are raised before any I/O.
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::EmptyMessage | ChatError::EmptyImageUri)
    }
}
