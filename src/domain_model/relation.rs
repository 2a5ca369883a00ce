use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Follow,
    Like,
    Repost,
    Save,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Follow,
        RelationKind::Like,
        RelationKind::Repost,
        RelationKind::Save,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Follow => "follow",
            RelationKind::Like => "like",
            RelationKind::Repost => "repost",
            RelationKind::Save => "save",
        }
    }

    /// Name of the denormalized counter kept on the object side.
    pub fn counter_name(self) -> &'static str {
        match self {
            RelationKind::Follow => "followers_count",
            RelationKind::Like => "likes_count",
            RelationKind::Repost => "reposts_count",
            RelationKind::Save => "saves_count",
        }
    }

    /// Follow targets a user, every other kind targets a post.
    pub fn targets_user(self) -> bool {
        matches!(self, RelationKind::Follow)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(RelationKind::Follow),
            "like" => Ok(RelationKind::Like),
            "repost" => Ok(RelationKind::Repost),
            "save" => Ok(RelationKind::Save),
            other => Err(format!("unknown relation kind: {other}")),
        }
    }
}

/// Object side of a relation edge.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ObjectRef {
    User(UserId),
    Post(PostId),
}

impl ObjectRef {
    pub fn uuid(&self) -> uuid::Uuid {
        match self {
            ObjectRef::User(id) => id.0,
            ObjectRef::Post(id) => id.0,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::User(id) => write!(f, "user:{id}"),
            ObjectRef::Post(id) => write!(f, "post:{id}"),
        }
    }
}

/// Strongly typed object id accepted by a relation capability.
pub trait RelationObject: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn to_ref(self) -> ObjectRef;
}

impl RelationObject for UserId {
    fn to_ref(self) -> ObjectRef {
        ObjectRef::User(self)
    }
}

impl RelationObject for PostId {
    fn to_ref(self) -> ObjectRef {
        ObjectRef::Post(self)
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepostPrivacy {
    #[default]
    Public,
    Followers,
    CloseFriends,
}

/// Kind-specific payload carried by an edge.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RelationAttrs {
    #[default]
    None,
    Follow {
        is_close_friend: bool,
    },
    Repost {
        privacy: RepostPrivacy,
        comment: Option<String>,
    },
}

impl RelationAttrs {
    /// Whether these attrs may travel with an edge of `kind`.
    pub fn fits(&self, kind: RelationKind) -> bool {
        match self {
            RelationAttrs::None => true,
            RelationAttrs::Follow { .. } => kind == RelationKind::Follow,
            RelationAttrs::Repost { .. } => kind == RelationKind::Repost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    pub subject_id: UserId,
    pub object: ObjectRef,
    pub kind: RelationKind,
    #[serde(default)]
    pub attrs: RelationAttrs,
    pub created_at: DateTime<Utc>,
}

/// Answer to a relation status check.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RelationStatus {
    pub is_active: bool,
    #[serde(default)]
    pub attrs: Option<RelationAttrs>,
}
