use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::InMemoryPushHub;
use crate::logger::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type EdgeKey = (RelationKind, UserId, ObjectRef);

/// Remote backend kept in process memory.
///
/// Relation edges carry denormalized per-object counters. Message inserts and
/// read-flag updates are published to the hub the way a database change feed
/// would publish them.
pub struct InMemoryRemoteStore {
    edges: DashMap<EdgeKey, RelationEdge>,
    counters: DashMap<(RelationKind, ObjectRef), u64>,
    messages: DashMap<MessageId, Message>,
    profiles: DashMap<UserId, SenderProfile>,
    shared: DashMap<uuid::Uuid, serde_json::Value>,
    injected_failures: Mutex<VecDeque<String>>,
    latency: Duration,
    hub: InMemoryPushHub,
}

impl InMemoryRemoteStore {
    pub fn new(hub: InMemoryPushHub) -> Self {
        Self {
            edges: DashMap::new(),
            counters: DashMap::new(),
            messages: DashMap::new(),
            profiles: DashMap::new(),
            shared: DashMap::new(),
            injected_failures: Mutex::new(VecDeque::new()),
            latency: Duration::ZERO,
            hub,
        }
    }

    /// Every remote call sleeps this long before touching state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn register_profile(&self, profile: SenderProfile) {
        self.profiles.insert(profile.user_id, profile);
    }

    /// Payload joined into share messages that reference `id`.
    pub fn register_shared(&self, id: uuid::Uuid, payload: serde_json::Value) {
        self.shared.insert(id, payload);
    }

    /// The next relation mutation fails with `reason`.
    pub fn fail_next_mutation(&self, reason: &str) {
        if let Ok(mut failures) = self.injected_failures.lock() {
            failures.push_back(reason.to_owned());
        }
    }

    pub fn count(&self, kind: RelationKind, object: ObjectRef) -> u64 {
        self.counters
            .get(&(kind, object))
            .map(|c| *c.value())
            .unwrap_or(0)
    }

    async fn remote_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn take_injected_failure(&self) -> Result<(), RelationError> {
        let injected = self
            .injected_failures
            .lock()
            .ok()
            .and_then(|mut failures| failures.pop_front());
        match injected {
            Some(reason) => Err(RelationError::Remote(reason)),
            None => Ok(()),
        }
    }

    fn check_object(kind: RelationKind, object: ObjectRef) -> Result<(), RelationError> {
        match (kind.targets_user(), object) {
            (true, ObjectRef::User(_)) | (false, ObjectRef::Post(_)) => Ok(()),
            _ => Err(RelationError::Remote(format!(
                "{kind} cannot target {object}"
            ))),
        }
    }

    fn adjust_counter(&self, kind: RelationKind, object: ObjectRef, increment: bool) {
        let mut counter = self.counters.entry((kind, object)).or_insert(0);
        *counter = if increment {
            counter.saturating_add(1)
        } else {
            counter.saturating_sub(1)
        };
        trace!(%kind, %object, counter = kind.counter_name(), value = *counter, "counter adjusted");
    }

    /// Message with sender profile and shared payload joined in.
    fn project(&self, message: &Message) -> Message {
        let mut projected = message.clone();
        projected.sender = self
            .profiles
            .get(&message.sender_id)
            .map(|p| p.value().clone());
        let shared_id = match &message.body {
            MessageBody::PostShare { post_id } => Some(post_id.0),
            MessageBody::EventShare { event_id } => Some(event_id.0),
            MessageBody::Text { .. } | MessageBody::Image { .. } => None,
        };
        projected.shared = shared_id.and_then(|id| self.shared.get(&id).map(|v| v.value().clone()));
        projected
    }

    fn publish(&self, kind: ChangeKind, record: serde_json::Value) {
        self.hub.publish(&ChangeEvent {
            kind,
            table: MESSAGES_TABLE.to_owned(),
            record,
        });
    }
}

// region relation store

#[async_trait::async_trait]
impl RelationStore for InMemoryRemoteStore {
    async fn check_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<RelationStatus, RelationError> {
        self.remote_latency().await;
        Self::check_object(kind, object)?;
        let status = match self.edges.get(&(kind, subject, object)) {
            Some(edge) => RelationStatus {
                is_active: true,
                attrs: Some(edge.value().attrs.clone()),
            },
            None => RelationStatus::default(),
        };
        Ok(status)
    }

    async fn create_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<RelationEdge, RelationError> {
        self.remote_latency().await;
        self.take_injected_failure()?;
        Self::check_object(kind, object)?;
        if !attrs.fits(kind) {
            return Err(RelationError::InvalidAttrs(kind));
        }

        let edge = match self.edges.entry((kind, subject, object)) {
            Entry::Occupied(existing) => {
                debug!(%kind, %subject, %object, "edge already present");
                return Ok(existing.get().clone());
            }
            Entry::Vacant(slot) => slot
                .insert(RelationEdge {
                    subject_id: subject,
                    object,
                    kind,
                    attrs: attrs.clone(),
                    created_at: Utc::now(),
                })
                .value()
                .clone(),
        };
        self.adjust_counter(kind, object, true);
        Ok(edge)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<(), RelationError> {
        self.remote_latency().await;
        self.take_injected_failure()?;
        if self.edges.remove(&(kind, subject, object)).is_some() {
            self.adjust_counter(kind, object, false);
        }
        Ok(())
    }

    async fn update_relation_attrs(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<(), RelationError> {
        self.remote_latency().await;
        self.take_injected_failure()?;
        if !attrs.fits(kind) {
            return Err(RelationError::InvalidAttrs(kind));
        }
        match self.edges.get_mut(&(kind, subject, object)) {
            Some(mut edge) => {
                edge.attrs = attrs.clone();
                Ok(())
            }
            None => Err(RelationError::Remote(format!(
                "no {kind} edge from {subject} to {object}"
            ))),
        }
    }
}

// endregion

// region message store

#[async_trait::async_trait]
impl MessageStore for InMemoryRemoteStore {
    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
        limit: HistoryLimit,
    ) -> Result<Vec<Message>, ChatError> {
        self.remote_latency().await;
        let mut window: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.value().conversation_id == conversation_id)
            .map(|m| self.project(m.value()))
            .collect();
        window.sort_by_key(Message::order_key);
        let skip = window.len().saturating_sub(limit.0 as usize);
        Ok(window.split_off(skip))
    }

    async fn fetch_message(&self, message_id: MessageId) -> Result<Message, ChatError> {
        self.remote_latency().await;
        let message = self
            .messages
            .get(&message_id)
            .map(|m| m.value().clone())
            .ok_or(ChatError::MessageNotFound(message_id))?;
        Ok(self.project(&message))
    }

    async fn send_message(&self, draft: &MessageDraft) -> Result<Message, ChatError> {
        self.remote_latency().await;
        let message = Message {
            id: MessageId(uuid::Uuid::new_v4()),
            conversation_id: draft.conversation_id,
            sender_id: draft.sender_id,
            body: draft.body.clone(),
            read: false,
            created_at: Utc::now(),
            sender: None,
            shared: None,
        };
        self.messages.insert(message.id, message.clone());

        let record =
            serde_json::to_value(&message).map_err(|e| ChatError::Remote(e.to_string()))?;
        self.publish(ChangeKind::Insert, record);
        Ok(self.project(&message))
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<(), ChatError> {
        self.remote_latency().await;
        let mut flipped = Vec::new();
        for mut entry in self.messages.iter_mut() {
            let message = entry.value_mut();
            if message.conversation_id == conversation_id
                && message.sender_id != reader
                && !message.read
            {
                message.read = true;
                flipped.push(message.id);
            }
        }

        debug!(%conversation_id, %reader, marked = flipped.len(), "messages marked read");
        for id in flipped {
            self.publish(
                ChangeKind::Update,
                json!({"id": id, "conversation_id": conversation_id, "read": true}),
            );
        }
        Ok(())
    }
}

// endregion

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn store() -> (InMemoryRemoteStore, InMemoryPushHub) {
        let hub = InMemoryPushHub::new();
        (InMemoryRemoteStore::new(hub.clone()), hub)
    }

    fn text(conversation_id: ConversationId, sender_id: UserId, content: &str) -> MessageDraft {
        MessageDraft {
            conversation_id,
            sender_id,
            body: MessageBody::Text {
                content: content.to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn create_is_idempotent_and_counted_once() {
        let (store, _) = store();
        let object = ObjectRef::User(user(2));
        let attrs = RelationAttrs::Follow {
            is_close_friend: true,
        };

        store
            .create_relation(RelationKind::Follow, user(1), object, &attrs)
            .await
            .unwrap();
        store
            .create_relation(RelationKind::Follow, user(1), object, &RelationAttrs::None)
            .await
            .unwrap();
        assert_eq!(store.count(RelationKind::Follow, object), 1);

        let status = store
            .check_relation(RelationKind::Follow, user(1), object)
            .await
            .unwrap();
        assert!(status.is_active);
        assert_eq!(status.attrs, Some(attrs));

        store
            .delete_relation(RelationKind::Follow, user(1), object)
            .await
            .unwrap();
        store
            .delete_relation(RelationKind::Follow, user(1), object)
            .await
            .unwrap();
        assert_eq!(store.count(RelationKind::Follow, object), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_count_the_edge_once() {
        let (store, _) = store();
        let store = std::sync::Arc::new(store);
        let object = ObjectRef::Post(post(9));

        let creates: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_relation(RelationKind::Like, user(1), object, &RelationAttrs::None)
                        .await
                })
            })
            .collect();
        for create in creates {
            create.await.unwrap().unwrap();
        }
        assert_eq!(store.count(RelationKind::Like, object), 1);
    }

    #[tokio::test]
    async fn injected_failure_hits_the_next_mutation_only() {
        let (store, _) = store();
        let object = ObjectRef::Post(post(1));
        store.fail_next_mutation("boom");

        let first = store
            .create_relation(RelationKind::Like, user(1), object, &RelationAttrs::None)
            .await;
        assert!(matches!(first, Err(RelationError::Remote(ref r)) if r == "boom"));
        assert_eq!(store.count(RelationKind::Like, object), 0);

        store
            .create_relation(RelationKind::Like, user(1), object, &RelationAttrs::None)
            .await
            .unwrap();
        assert_eq!(store.count(RelationKind::Like, object), 1);
    }

    #[tokio::test]
    async fn kind_and_object_must_agree() {
        let (store, _) = store();
        let result = store
            .check_relation(RelationKind::Follow, user(1), ObjectRef::Post(post(1)))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn history_is_the_newest_window_in_ascending_order() {
        let (store, _) = store();
        let c = conversation(1);
        for n in 0..5 {
            store
                .send_message(&text(c, user(1), &format!("m{n}")))
                .await
                .unwrap();
        }
        store
            .send_message(&text(conversation(2), user(1), "elsewhere"))
            .await
            .unwrap();

        let window = store.fetch_messages(c, HistoryLimit(3)).await.unwrap();
        let contents: Vec<_> = window
            .iter()
            .map(|m| match &m.body {
                MessageBody::Text { content } => content.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn send_publishes_insert_and_mark_read_publishes_updates() {
        let (store, hub) = store();
        let c = conversation(1);
        let mut feed = hub
            .subscribe(ChangeTopic::filtered(
                MESSAGES_TABLE,
                RowFilter::eq("conversation_id", c),
            ))
            .await
            .unwrap();
        store.register_profile(SenderProfile {
            user_id: user(2),
            username: "peer".to_owned(),
            avatar_url: None,
        });

        let sent = store.send_message(&text(c, user(2), "hi")).await.unwrap();
        assert_eq!(sent.sender.as_ref().unwrap().username, "peer");
        let inserted = feed.next().await.unwrap();
        assert_eq!(inserted.kind, ChangeKind::Insert);
        assert_eq!(inserted.record["id"], serde_json::to_value(sent.id).unwrap());

        store.mark_read(c, user(2)).await.unwrap();
        store.mark_read(c, user(1)).await.unwrap();
        let updated = feed.next().await.unwrap();
        assert_eq!(updated.kind, ChangeKind::Update);
        assert_eq!(updated.record["read"], true);
        assert!(store.fetch_message(sent.id).await.unwrap().read);
    }

    #[tokio::test]
    async fn share_messages_join_the_shared_payload() {
        let (store, _) = store();
        let post_id = post(9);
        store.register_shared(post_id.0, json!({"caption": "sunset"}));

        let draft = MessageDraft {
            conversation_id: conversation(1),
            sender_id: user(1),
            body: MessageBody::PostShare { post_id },
        };
        let sent = store.send_message(&draft).await.unwrap();
        assert_eq!(sent.shared, Some(json!({"caption": "sunset"})));
    }
}
