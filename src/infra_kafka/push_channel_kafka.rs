use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use futures_util::StreamExt;
use nanoid::nanoid;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use std::time::Duration;
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;

const SUBSCRIPTION_CAP: usize = 256;

/// Change feed read from a change-data-capture topic.
///
/// Each subscription runs its own consumer in a throwaway group starting at
/// the latest offset, so it sees every change committed after it subscribed.
pub struct KafkaPushChannel {
    bootstrap_servers: String,
    topic: String,
    client_id: String,
}

impl KafkaPushChannel {
    pub fn new(bootstrap_servers: &str, topic: &str, client_id: &str) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.to_owned(),
            topic: topic.to_owned(),
            client_id: client_id.to_owned(),
        }
    }

    fn create_consumer(&self, group_id: &str) -> Result<StreamConsumer, PushError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("client.id", &self.client_id)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "latest")
            .create()
            .map_err(|e| PushError::Subscribe(e.to_string()))?;
        consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| PushError::Subscribe(e.to_string()))?;
        Ok(consumer)
    }
}

/// Payload layout: `{"table": .., "type": "INSERT" | "UPDATE", "record": {..}}`.
pub fn decode_change(payload: &[u8]) -> Result<ChangeEvent, PushError> {
    serde_json::from_slice(payload).map_err(|e| PushError::Malformed(e.to_string()))
}

#[async_trait::async_trait]
impl PushChannel for KafkaPushChannel {
    async fn subscribe(&self, topic: ChangeTopic) -> Result<Subscription, PushError> {
        let group_id = format!("{}-{}", self.client_id, nanoid!(10));
        let consumer = self.create_consumer(&group_id)?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAP);
        let release = CancellationToken::new();

        info!(%topic, %group_id, kafka_topic = %self.topic, "kafka subscription started");
        tokio::spawn(consume(consumer, topic.clone(), tx, release.clone()));

        Ok(Subscription::new(topic, rx, release))
    }
}

async fn consume(
    consumer: StreamConsumer,
    topic: ChangeTopic,
    tx: Sender<ChangeEvent>,
    release: CancellationToken,
) {
    let mut stream = consumer.stream();

    loop {
        let result = tokio::select! {
            biased;
            _ = release.cancelled() => break,
            msg = stream.next() => msg,
        };

        let Some(message) = result else {
            error!(%topic, "kafka consumer stream terminated");
            break;
        };

        match message {
            Err(e) => {
                // broker hiccup
                warn!(error = ?e, "consumer poll error");
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Ok(m) => {
                let payload = m.payload().unwrap_or(&[]);
                let event = match decode_change(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(offset = m.offset(), "skipping change: {e}");
                        continue;
                    }
                };
                if !topic.matches(&event) {
                    continue;
                }
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(stream);
    consumer.unsubscribe();
    debug!(%topic, "kafka subscription released");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_cdc_payloads() {
        let event = decode_change(
            br#"{"table":"messages","type":"UPDATE","record":{"id":"x","read":true}}"#,
        )
        .unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.table, MESSAGES_TABLE);
        assert_eq!(event.record["read"], true);
    }

    #[test]
    fn rejects_unknown_change_types() {
        let result = decode_change(br#"{"table":"messages","type":"DELETE","record":{}}"#);
        assert!(matches!(result, Err(PushError::Malformed(_))));
    }
}
