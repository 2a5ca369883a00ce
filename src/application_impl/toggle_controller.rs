use crate::application_impl::Optimistic;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone, Copy)]
struct ToggleSnapshot {
    active: bool,
    count: u64,
}

/// Optimistic view of one relation edge plus its counter. Dropping it
/// detaches: in-flight calls still land but their results are discarded.
pub struct ToggleController<C: RelationCapability> {
    inner: Arc<ToggleInner<C>>,
    _detach: DropGuard,
}

struct ToggleInner<C: RelationCapability> {
    capability: C,
    // None when inert
    edge: Option<(UserId, C::Object)>,
    state: watch::Sender<ToggleView>,
    errors: Arc<dyn ErrorSink>,
    detached: CancellationToken,
}

/// Dropping it does not cancel the call.
pub struct PendingMutation {
    handle: JoinHandle<Result<ToggleView, RelationError>>,
}

impl PendingMutation {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<ToggleView, RelationError>> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub async fn settled(self) -> Result<ToggleView, RelationError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!("toggle task ended abnormally: {e}");
                Err(RelationError::Detached)
            }
        }
    }
}

impl<C: RelationCapability> ToggleController<C> {
    /// Inert when either id is missing or both name the same entity.
    pub fn new(
        capability: C,
        subject: Option<UserId>,
        object: Option<C::Object>,
        initial_count: Option<u64>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        let edge = match (subject, object) {
            (Some(subject), Some(object)) if subject.0 != object.to_ref().uuid() => {
                Some((subject, object))
            }
            _ => None,
        };

        let (state, _) = watch::channel(ToggleView {
            active: false,
            count: initial_count.unwrap_or_default(),
            pending: edge.is_some(),
            attrs: None,
        });
        let detached = CancellationToken::new();
        let inner = Arc::new(ToggleInner {
            capability,
            edge,
            state,
            errors,
            detached: detached.clone(),
        });

        match edge {
            Some((subject, object)) => {
                tokio::spawn(inner.clone().check_edge(subject, object));
            }
            None => debug!(kind = %inner.capability.kind(), "toggle is inert"),
        }

        Self {
            inner,
            _detach: detached.drop_guard(),
        }
    }

    pub fn kind(&self) -> RelationKind {
        self.inner.capability.kind()
    }

    pub fn is_inert(&self) -> bool {
        self.inner.edge.is_none()
    }

    pub fn view(&self) -> ToggleView {
        self.inner.view()
    }

    pub fn watch(&self) -> watch::Receiver<ToggleView> {
        self.inner.state.subscribe()
    }

    pub async fn settled(&self) -> ToggleView {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(|view| !view.pending).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    /// `None` while inert or pending.
    pub fn toggle(&self) -> Option<PendingMutation> {
        let (subject, object) = self.inner.edge?;

        let optimistic = Optimistic::begin(&self.inner.state, |view: &mut ToggleView| {
            if view.pending {
                return None;
            }
            let snapshot = ToggleSnapshot {
                active: view.active,
                count: view.count,
            };
            view.active = !snapshot.active;
            view.count = if snapshot.active {
                snapshot.count.saturating_sub(1)
            } else {
                snapshot.count.saturating_add(1)
            };
            view.pending = true;
            Some(snapshot)
        });
        let Some(optimistic) = optimistic else {
            trace!(kind = %self.kind(), "toggle ignored while pending");
            return None;
        };

        let activate = !optimistic.snapshot().active;
        let inner = self.inner.clone();
        Some(PendingMutation::spawn(inner.confirm_toggle(
            subject, object, activate, optimistic,
        )))
    }

    /// `Ok(None)` when inert, pending or inactive.
    pub fn edit(&self, attrs: RelationAttrs) -> Result<Option<PendingMutation>, RelationError> {
        let kind = self.kind();
        if !self.inner.capability.supports_edit() {
            return Err(RelationError::Unsupported(kind));
        }
        if attrs == RelationAttrs::None || !attrs.fits(kind) {
            return Err(RelationError::InvalidAttrs(kind));
        }
        let Some((subject, object)) = self.inner.edge else {
            return Ok(None);
        };

        let next = attrs.clone();
        let optimistic = Optimistic::begin(&self.inner.state, |view: &mut ToggleView| {
            if view.pending || !view.active {
                return None;
            }
            let previous = view.attrs.replace(next);
            view.pending = true;
            Some(previous)
        });
        let Some(optimistic) = optimistic else {
            return Ok(None);
        };

        let inner = self.inner.clone();
        Ok(Some(PendingMutation::spawn(
            inner.confirm_edit(subject, object, attrs, optimistic),
        )))
    }

    /// Adopts an authoritative count as the new baseline, dropping any local delta.
    pub fn sync_count(&self, count: u64) {
        self.inner.state.send_if_modified(|view| {
            if view.count == count {
                return false;
            }
            debug!(kind = %self.inner.capability.kind(), from = view.count, to = count, "count resynced");
            view.count = count;
            true
        });
    }
}

impl<C: RelationCapability> ToggleInner<C> {
    fn view(&self) -> ToggleView {
        self.state.borrow().clone()
    }

    fn report(&self, error: &RelationError) {
        self.errors.report(&EngineError::Relation {
            kind: self.capability.kind(),
            error: error.clone(),
        });
    }

    async fn check_edge(self: Arc<Self>, subject: UserId, object: C::Object) {
        let kind = self.capability.kind();
        let result = self.capability.check(subject, object).await;
        if self.detached.is_cancelled() {
            trace!(%kind, "status result dropped after detach");
            return;
        }

        match result {
            Ok(status) => {
                debug!(%kind, %subject, %object, active = status.is_active, "relation checked");
                self.state.send_modify(|view| {
                    view.active = status.is_active;
                    view.attrs = if status.is_active { status.attrs } else { None };
                    view.pending = false;
                });
            }
            Err(e) => {
                warn!(%kind, %subject, %object, "relation check failed: {e}");
                self.state.send_modify(|view| {
                    view.active = false;
                    view.pending = false;
                });
            }
        }
    }

    async fn confirm_toggle(
        self: Arc<Self>,
        subject: UserId,
        object: C::Object,
        activate: bool,
        optimistic: Optimistic<ToggleSnapshot>,
    ) -> Result<ToggleView, RelationError> {
        let kind = self.capability.kind();
        let result = if activate {
            self.capability
                .create(subject, object)
                .await
                .map(|edge| Some(edge.attrs))
        } else {
            self.capability.delete(subject, object).await.map(|_| None)
        };

        if self.detached.is_cancelled() {
            debug!(%kind, "toggle result dropped after detach");
            return Err(RelationError::Detached);
        }

        match result {
            Ok(attrs) => {
                optimistic.commit(&self.state, |view| {
                    view.attrs = attrs;
                    view.pending = false;
                });
                debug!(%kind, %subject, %object, activate, "toggle confirmed");
                Ok(self.view())
            }
            Err(error) => {
                warn!(%kind, %subject, %object, activate, "toggle failed, rolling back: {error}");
                optimistic.rollback(&self.state, |view, snapshot| {
                    view.active = snapshot.active;
                    view.count = snapshot.count;
                    view.pending = false;
                });
                self.report(&error);
                Err(error)
            }
        }
    }

    async fn confirm_edit(
        self: Arc<Self>,
        subject: UserId,
        object: C::Object,
        attrs: RelationAttrs,
        optimistic: Optimistic<Option<RelationAttrs>>,
    ) -> Result<ToggleView, RelationError> {
        let kind = self.capability.kind();
        let result = self.capability.edit(subject, object, &attrs).await;

        if self.detached.is_cancelled() {
            debug!(%kind, "edit result dropped after detach");
            return Err(RelationError::Detached);
        }

        match result {
            Ok(()) => {
                optimistic.commit(&self.state, |view| view.pending = false);
                debug!(%kind, %subject, %object, "attributes updated");
                Ok(self.view())
            }
            Err(error) => {
                warn!(%kind, %subject, %object, "attribute edit failed, rolling back: {error}");
                optimistic.rollback(&self.state, |view, previous| {
                    view.attrs = previous;
                    view.pending = false;
                });
                self.report(&error);
                Err(error)
            }
        }
    }
}
