use crate::application_port::*;
use crate::domain_model::*;

/// Remote source of truth for relation edges.
#[async_trait::async_trait]
pub trait RelationStore: Send + Sync {
    async fn check_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<RelationStatus, RelationError>;
    /// Idempotent: an existing edge is reported as success.
    async fn create_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<RelationEdge, RelationError>;
    async fn delete_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<(), RelationError>;
    async fn update_relation_attrs(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<(), RelationError>;
}
