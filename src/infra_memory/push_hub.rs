use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use dashmap::DashMap;
use nanoid::nanoid;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Sender, error::TrySendError};
use tokio_util::sync::CancellationToken;

const SUBSCRIBER_CAP: usize = 256;

struct Subscriber {
    topic: ChangeTopic,
    tx: Sender<ChangeEvent>,
}

/// Fans published row changes out to every subscription whose topic matches.
#[derive(Clone, Default)]
pub struct InMemoryPushHub {
    subscribers: Arc<DashMap<String, Subscriber>>,
}

impl InMemoryPushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many subscriptions accepted the event.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if !subscriber.topic.matches(event) {
                continue;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscription = %entry.key(), topic = %subscriber.topic, "subscriber lagging, change dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(entry.key().clone()),
            }
        }

        for key in closed {
            self.subscribers.remove(&key);
        }
        trace!(table = %event.table, kind = ?event.kind, delivered, "change published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[async_trait::async_trait]
impl PushChannel for InMemoryPushHub {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, PushError> {
        let key = nanoid!();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAP);
        self.subscribers.insert(
            key.clone(),
            Subscriber {
                topic: topic.clone(),
                tx,
            },
        );
        debug!(subscription = %key, %topic, "subscribed");

        let release = CancellationToken::new();
        let released = release.clone();
        let subscribers = self.subscribers.clone();
        tokio::spawn(async move {
            released.cancelled().await;
            subscribers.remove(&key);
            debug!(subscription = %key, "unsubscribed");
        });

        Ok(Subscription::new(topic, rx, release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::task::yield_now;

    fn insert(table: &str, conversation: &str) -> ChangeEvent {
        ChangeEvent {
            kind: ChangeKind::Insert,
            table: table.to_owned(),
            record: json!({"id": "m", "conversation_id": conversation}),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_matching_topics() {
        let hub = InMemoryPushHub::new();
        let mut c1 = hub
            .subscribe(ChangeTopic::filtered(MESSAGES_TABLE, RowFilter::eq("conversation_id", "c1")))
            .await
            .unwrap();
        let mut all = hub.subscribe(ChangeTopic::table(MESSAGES_TABLE)).await.unwrap();

        assert_eq!(hub.publish(&insert(MESSAGES_TABLE, "c2")), 1);
        assert_eq!(hub.publish(&insert(MESSAGES_TABLE, "c1")), 2);
        assert_eq!(hub.publish(&insert("likes", "c1")), 0);

        assert_eq!(c1.next().await.unwrap().record["conversation_id"], "c1");
        assert_eq!(all.next().await.unwrap().record["conversation_id"], "c2");
        assert_eq!(all.next().await.unwrap().record["conversation_id"], "c1");
    }

    #[tokio::test]
    async fn dropping_the_subscription_releases_it() {
        let hub = InMemoryPushHub::new();
        let subscription = hub.subscribe(ChangeTopic::table(MESSAGES_TABLE)).await.unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        drop(subscription);
        for _ in 0..16 {
            if hub.subscriber_count() == 0 {
                break;
            }
            yield_now().await;
        }
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(&insert(MESSAGES_TABLE, "c1")), 0);
    }
}
