use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub uuid::Uuid);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    PostShare,
    EventShare,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessageBody {
    Text { content: String },
    Image { uri: String },
    PostShare { post_id: PostId },
    EventShare { event_id: EventId },
}

impl MessageBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Text { .. } => MessageType::Text,
            MessageBody::Image { .. } => MessageType::Image,
            MessageBody::PostShare { .. } => MessageType::PostShare,
            MessageBody::EventShare { .. } => MessageType::EventShare,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Full message projection, including joined sender profile and shared payload.
/// Only `read` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub body: MessageBody,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<SenderProfile>,
    #[serde(default)]
    pub shared: Option<serde_json::Value>,
}

impl Message {
    /// `created_at` ascending, `id` breaks ties.
    pub fn order_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.created_at, self.id)
    }
}

/// Row shape delivered by the change feed; anything beyond `id` may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRow {
    pub id: MessageId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub read: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDraft {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub body: MessageBody,
}
