//! Scripted remote stores for controller tests.
//!
//! Every remote call is recorded. Calls can be held behind a gate so a test
//! can observe the state while the call is still in flight.

use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Semaphore;

pub fn user(n: u128) -> UserId {
    UserId(uuid::Uuid::from_u128(n))
}

pub fn post(n: u128) -> PostId {
    PostId(uuid::Uuid::from_u128(0xF000 + n))
}

pub fn conversation(n: u128) -> ConversationId {
    ConversationId(uuid::Uuid::from_u128(0xC000 + n))
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn text_message(
    n: u128,
    conversation_id: ConversationId,
    sender_id: UserId,
    content: &str,
    secs: i64,
) -> Message {
    Message {
        id: MessageId(uuid::Uuid::from_u128(0xA000 + n)),
        conversation_id,
        sender_id,
        body: MessageBody::Text {
            content: content.to_owned(),
        },
        read: false,
        created_at: at(secs),
        sender: Some(SenderProfile {
            user_id: sender_id,
            username: format!("user-{}", sender_id.0.as_u128()),
            avatar_url: None,
        }),
        shared: None,
    }
}

/// A gate that is open until `hold` is called; `release(n)` lets `n` waiters through.
#[derive(Debug)]
pub struct Gate {
    held: AtomicBool,
    permits: Semaphore,
}

impl Gate {
    fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            permits: Semaphore::new(0),
        }
    }

    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.permits.acquire().await {
                permit.forget();
            }
        }
    }
}

// region relation store

#[derive(Debug, Clone, PartialEq)]
pub enum RelationCall {
    Check(RelationKind),
    Create(RelationKind, RelationAttrs),
    Delete(RelationKind),
    Edit(RelationKind, RelationAttrs),
}

#[derive(Debug)]
pub struct ScriptedRelationStore {
    status: Mutex<Result<RelationStatus, RelationError>>,
    outcomes: Mutex<VecDeque<Result<(), RelationError>>>,
    calls: Mutex<Vec<RelationCall>>,
    pub check_gate: Gate,
    pub mutation_gate: Gate,
}

impl ScriptedRelationStore {
    pub fn new(is_active: bool) -> Self {
        Self {
            status: Mutex::new(Ok(RelationStatus {
                is_active,
                attrs: None,
            })),
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            check_gate: Gate::new(),
            mutation_gate: Gate::new(),
        }
    }

    pub fn with_status(status: RelationStatus) -> Self {
        let store = Self::new(false);
        *store.status.lock().unwrap() = Ok(status);
        store
    }

    pub fn check_fails(&self, message: &str) {
        *self.status.lock().unwrap() = Err(RelationError::Remote(message.to_owned()));
    }

    /// Outcome of the next mutation; unscripted mutations succeed.
    pub fn then(&self, outcome: Result<(), RelationError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RelationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, RelationCall::Check(_)))
            .count()
    }

    async fn mutate(&self, call: RelationCall) -> Result<(), RelationError> {
        self.calls.lock().unwrap().push(call);
        self.mutation_gate.pass().await;
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait::async_trait]
impl RelationStore for ScriptedRelationStore {
    async fn check_relation(
        &self,
        kind: RelationKind,
        _subject: UserId,
        _object: ObjectRef,
    ) -> Result<RelationStatus, RelationError> {
        self.calls.lock().unwrap().push(RelationCall::Check(kind));
        self.check_gate.pass().await;
        self.status.lock().unwrap().clone()
    }

    async fn create_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<RelationEdge, RelationError> {
        self.mutate(RelationCall::Create(kind, attrs.clone())).await?;
        Ok(RelationEdge {
            subject_id: subject,
            object,
            kind,
            attrs: attrs.clone(),
            created_at: Utc::now(),
        })
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        _subject: UserId,
        _object: ObjectRef,
    ) -> Result<(), RelationError> {
        self.mutate(RelationCall::Delete(kind)).await
    }

    async fn update_relation_attrs(
        &self,
        kind: RelationKind,
        _subject: UserId,
        _object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<(), RelationError> {
        self.mutate(RelationCall::Edit(kind, attrs.clone())).await
    }
}

// endregion

// region message store

#[derive(Debug)]
pub struct ScriptedMessageStore {
    history: Mutex<Result<Vec<Message>, ChatError>>,
    projections: Mutex<HashMap<MessageId, Message>>,
    send_outcomes: Mutex<VecDeque<Result<Message, ChatError>>>,
    sent: Mutex<Vec<MessageDraft>>,
    read_marks: Mutex<Vec<(ConversationId, UserId)>>,
    fetches: Mutex<usize>,
    projection_fetches: Mutex<usize>,
    pub history_gate: Gate,
    pub projection_gate: Gate,
    pub send_gate: Gate,
    pub read_gate: Gate,
}

impl ScriptedMessageStore {
    pub fn new(history: Vec<Message>) -> Self {
        let projections = history.iter().map(|m| (m.id, m.clone())).collect();
        Self {
            history: Mutex::new(Ok(history)),
            projections: Mutex::new(projections),
            send_outcomes: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            read_marks: Mutex::new(Vec::new()),
            fetches: Mutex::new(0),
            projection_fetches: Mutex::new(0),
            history_gate: Gate::new(),
            projection_gate: Gate::new(),
            send_gate: Gate::new(),
            read_gate: Gate::new(),
        }
    }

    pub fn history_fails(&self, message: &str) {
        *self.history.lock().unwrap() = Err(ChatError::Remote(message.to_owned()));
    }

    pub fn set_history(&self, history: Vec<Message>) {
        self.project_all(&history);
        *self.history.lock().unwrap() = Ok(history);
    }

    /// Makes a message resolvable by id, as if it had been committed remotely.
    pub fn project(&self, message: &Message) {
        self.projections
            .lock()
            .unwrap()
            .insert(message.id, message.clone());
    }

    fn project_all(&self, messages: &[Message]) {
        for message in messages {
            self.project(message);
        }
    }

    pub fn then_send(&self, outcome: Result<Message, ChatError>) {
        self.send_outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn sent(&self) -> Vec<MessageDraft> {
        self.sent.lock().unwrap().clone()
    }

    pub fn read_marks(&self) -> Vec<(ConversationId, UserId)> {
        self.read_marks.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn projection_fetch_count(&self) -> usize {
        *self.projection_fetches.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl MessageStore for ScriptedMessageStore {
    async fn fetch_messages(
        &self,
        _conversation_id: ConversationId,
        _limit: HistoryLimit,
    ) -> Result<Vec<Message>, ChatError> {
        *self.fetches.lock().unwrap() += 1;
        self.history_gate.pass().await;
        self.history.lock().unwrap().clone()
    }

    async fn fetch_message(&self, message_id: MessageId) -> Result<Message, ChatError> {
        *self.projection_fetches.lock().unwrap() += 1;
        self.projection_gate.pass().await;
        self.projections
            .lock()
            .unwrap()
            .get(&message_id)
            .cloned()
            .ok_or(ChatError::MessageNotFound(message_id))
    }

    async fn send_message(&self, draft: &MessageDraft) -> Result<Message, ChatError> {
        self.sent.lock().unwrap().push(draft.clone());
        self.send_gate.pass().await;
        let scripted = self.send_outcomes.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(Message {
                id: MessageId(uuid::Uuid::new_v4()),
                conversation_id: draft.conversation_id,
                sender_id: draft.sender_id,
                body: draft.body.clone(),
                read: false,
                created_at: Utc::now(),
                sender: None,
                shared: None,
            })
        })
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<(), ChatError> {
        self.read_marks
            .lock()
            .unwrap()
            .push((conversation_id, reader));
        self.read_gate.pass().await;
        Ok(())
    }
}

// endregion
