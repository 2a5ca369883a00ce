use crate::application_port::*;
use crate::domain_model::*;

/// Remote source of truth for conversation messages.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Newest `limit` messages, returned `created_at` ascending.
    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
        limit: HistoryLimit,
    ) -> Result<Vec<Message>, ChatError>;
    /// Full projection of one message, joins included.
    async fn fetch_message(&self, message_id: MessageId) -> Result<Message, ChatError>;
    async fn send_message(&self, draft: &MessageDraft) -> Result<Message, ChatError>;
    /// Marks every message in the conversation not sent by `reader` as read.
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<(), ChatError>;
}
