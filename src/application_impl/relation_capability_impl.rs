use crate::application_impl::ToggleController;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::RelationStore;
use std::sync::Arc;

pub type FollowToggle = ToggleController<FollowRelation>;
pub type LikeToggle = ToggleController<LikeRelation>;
pub type RepostToggle = ToggleController<RepostRelation>;
pub type SaveToggle = ToggleController<SaveRelation>;

// region follow

pub struct FollowRelation {
    store: Arc<dyn RelationStore>,
    is_close_friend: bool,
}

impl FollowRelation {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            is_close_friend: false,
        }
    }

    /// Follow that is created with the close-friend flag set.
    pub fn close_friend(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            is_close_friend: true,
        }
    }
}

#[async_trait::async_trait]
impl RelationCapability for FollowRelation {
    type Object = UserId;

    fn kind(&self) -> RelationKind {
        RelationKind::Follow
    }

    fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    fn create_attrs(&self) -> RelationAttrs {
        RelationAttrs::Follow {
            is_close_friend: self.is_close_friend,
        }
    }

    fn supports_edit(&self) -> bool {
        true
    }
}

// endregion

// region like

pub struct LikeRelation {
    store: Arc<dyn RelationStore>,
}

impl LikeRelation {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl RelationCapability for LikeRelation {
    type Object = PostId;

    fn kind(&self) -> RelationKind {
        RelationKind::Like
    }

    fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }
}

// endregion

// region repost

pub struct RepostRelation {
    store: Arc<dyn RelationStore>,
    privacy: RepostPrivacy,
    comment: Option<String>,
}

impl RepostRelation {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self {
            store,
            privacy: RepostPrivacy::Public,
            comment: None,
        }
    }

    pub fn with_options(
        store: Arc<dyn RelationStore>,
        privacy: RepostPrivacy,
        comment: Option<String>,
    ) -> Self {
        // blank comments are not stored
        let comment = comment
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        Self {
            store,
            privacy,
            comment,
        }
    }
}

#[async_trait::async_trait]
impl RelationCapability for RepostRelation {
    type Object = PostId;

    fn kind(&self) -> RelationKind {
        RelationKind::Repost
    }

    fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }

    fn create_attrs(&self) -> RelationAttrs {
        RelationAttrs::Repost {
            privacy: self.privacy,
            comment: self.comment.clone(),
        }
    }

    fn supports_edit(&self) -> bool {
        true
    }
}

// endregion

// region save

pub struct SaveRelation {
    store: Arc<dyn RelationStore>,
}

impl SaveRelation {
    pub fn new(store: Arc<dyn RelationStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl RelationCapability for SaveRelation {
    type Object = PostId;

    fn kind(&self) -> RelationKind {
        RelationKind::Save
    }

    fn store(&self) -> &Arc<dyn RelationStore> {
        &self.store
    }
}

// endregion
