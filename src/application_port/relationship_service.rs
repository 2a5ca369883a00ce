use crate::domain_model::*;
use crate::domain_port::RelationStore;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RelationError {
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("{0} edges have no editable attributes")]
    Unsupported(RelationKind),
    #[error("attributes do not fit a {0} edge")]
    InvalidAttrs(RelationKind),
    #[error("controller detached before the result arrived")]
    Detached,
}

/// Per-kind access to the remote relation store: `{check, create, delete}`
/// plus the optional attribute edit path.
///
/// Implementors only choose the kind, the object type and the payload sent on
/// create; the remote calls default to the shared [`RelationStore`].
#[async_trait::async_trait]
pub trait RelationCapability: Send + Sync + 'static {
    type Object: RelationObject;

    fn kind(&self) -> RelationKind;

    fn store(&self) -> &Arc<dyn RelationStore>;

    /// Payload sent along with `create`.
    fn create_attrs(&self) -> RelationAttrs {
        RelationAttrs::None
    }

    fn supports_edit(&self) -> bool {
        false
    }

    async fn check(
        &self,
        subject: UserId,
        object: Self::Object,
    ) -> Result<RelationStatus, RelationError> {
        self.store()
            .check_relation(self.kind(), subject, object.to_ref())
            .await
    }

    /// Must succeed when the edge already exists.
    async fn create(
        &self,
        subject: UserId,
        object: Self::Object,
    ) -> Result<RelationEdge, RelationError> {
        let attrs = self.create_attrs();
        self.store()
            .create_relation(self.kind(), subject, object.to_ref(), &attrs)
            .await
    }

    async fn delete(&self, subject: UserId, object: Self::Object) -> Result<(), RelationError> {
        self.store()
            .delete_relation(self.kind(), subject, object.to_ref())
            .await
    }

    async fn edit(
        &self,
        subject: UserId,
        object: Self::Object,
        attrs: &RelationAttrs,
    ) -> Result<(), RelationError> {
        if !self.supports_edit() {
            return Err(RelationError::Unsupported(self.kind()));
        }
        if !attrs.fits(self.kind()) {
            return Err(RelationError::InvalidAttrs(self.kind()));
        }
        self.store()
            .update_relation_attrs(self.kind(), subject, object.to_ref(), attrs)
            .await
    }
}
