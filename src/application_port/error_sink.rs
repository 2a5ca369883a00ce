use crate::application_port::*;
use crate::domain_model::*;

/// A failure the user should hear about.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("{kind} failed: {error}")]
    Relation {
        kind: RelationKind,
        #[source]
        error: RelationError,
    },
    #[error("conversation {conversation_id}: {error}")]
    Chat {
        conversation_id: ConversationId,
        #[source]
        error: ChatError,
    },
}

/// Receives every failed remote mutation exactly once. Presentation is up to the host.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &EngineError);
}
