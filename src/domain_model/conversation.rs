use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub uuid::Uuid);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(ConversationId)
    }
}

/// Direct conversation between two participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: ConversationId,
    pub participants: (UserId, UserId),
}

impl Conversation {
    pub fn includes(&self, user_id: UserId) -> bool {
        self.participants.0 == user_id || self.participants.1 == user_id
    }

    pub fn other(&self, me: UserId) -> Option<UserId> {
        if self.participants.0 == me {
            Some(self.participants.1)
        } else if self.participants.1 == me {
            Some(self.participants.0)
        } else {
            None
        }
    }
}
