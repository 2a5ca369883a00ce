use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::RelationStore;
use serde::Deserialize;
use std::sync::Arc;

/// Kind-erased handle on a mounted [`ToggleController`].
#[async_trait::async_trait]
pub trait MountedToggle: Send + Sync {
    fn kind(&self) -> RelationKind;
    fn view(&self) -> ToggleView;
    fn toggle(&self) -> Option<PendingMutation>;
    fn edit(&self, attrs: RelationAttrs) -> Result<Option<PendingMutation>, RelationError>;
    fn sync_count(&self, count: u64);
    async fn settled(&self) -> ToggleView;
}

#[async_trait::async_trait]
impl<C: RelationCapability> MountedToggle for ToggleController<C> {
    fn kind(&self) -> RelationKind {
        ToggleController::kind(self)
    }

    fn view(&self) -> ToggleView {
        ToggleController::view(self)
    }

    fn toggle(&self) -> Option<PendingMutation> {
        ToggleController::toggle(self)
    }

    fn edit(&self, attrs: RelationAttrs) -> Result<Option<PendingMutation>, RelationError> {
        ToggleController::edit(self, attrs)
    }

    fn sync_count(&self, count: u64) {
        ToggleController::sync_count(self, count)
    }

    async fn settled(&self) -> ToggleView {
        ToggleController::settled(self).await
    }
}

/// What a host asks for when it mounts a toggle. Missing ids give an inert toggle.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleMount {
    pub kind: RelationKind,
    #[serde(default)]
    pub subject_id: Option<UserId>,
    /// A user id for `follow`, a post id for every other kind.
    #[serde(default)]
    pub object_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub initial_count: Option<u64>,
    #[serde(default)]
    pub close_friend: bool,
    #[serde(default)]
    pub privacy: Option<RepostPrivacy>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ToggleMount {
    pub fn build(
        &self,
        store: Arc<dyn RelationStore>,
        errors: Arc<dyn ErrorSink>,
    ) -> Arc<dyn MountedToggle> {
        let subject = self.subject_id;
        let count = self.initial_count;
        match self.kind {
            RelationKind::Follow => {
                let capability = if self.close_friend {
                    FollowRelation::close_friend(store)
                } else {
                    FollowRelation::new(store)
                };
                let object = self.object_id.map(UserId);
                Arc::new(FollowToggle::new(capability, subject, object, count, errors))
            }
            RelationKind::Like => {
                let object = self.object_id.map(PostId);
                Arc::new(LikeToggle::new(
                    LikeRelation::new(store),
                    subject,
                    object,
                    count,
                    errors,
                ))
            }
            RelationKind::Repost => {
                let capability = RepostRelation::with_options(
                    store,
                    self.privacy.unwrap_or_default(),
                    self.comment.clone(),
                );
                let object = self.object_id.map(PostId);
                Arc::new(RepostToggle::new(capability, subject, object, count, errors))
            }
            RelationKind::Save => {
                let object = self.object_id.map(PostId);
                Arc::new(SaveToggle::new(
                    SaveRelation::new(store),
                    subject,
                    object,
                    count,
                    errors,
                ))
            }
        }
    }
}
