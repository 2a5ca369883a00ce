use crate::application_port::*;
use crate::domain_model::*;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Change feed keyed by table and row filter.
#[async_trait::async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, PushError>;
}

/// A live subscription. Dropping it releases the channel exactly once.
pub struct Subscription {
    topic: ChangeTopic,
    events: Receiver<ChangeEvent>,
    _release: DropGuard,
}

impl Subscription {
    /// `release` is cancelled when the subscription is dropped; the channel
    /// implementation tears its side down on that signal.
    pub fn new(topic: ChangeTopic, events: Receiver<ChangeEvent>, release: CancellationToken) -> Self {
        Self {
            topic,
            events,
            _release: release.drop_guard(),
        }
    }

    pub fn topic(&self) -> &ChangeTopic {
        &self.topic
    }

    /// Next event in delivery order, `None` once the channel side is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish()
    }
}
