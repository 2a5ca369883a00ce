use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

#[derive(Debug, Clone, Copy, Default)]
pub struct MessageStreamConfig {
    pub history_limit: HistoryLimit,
}

/// One conversation's message list, merged with its change feed. Rows pushed
/// during the history fetch queue up and are applied once it lands.
pub struct MessageStream {
    inner: Arc<StreamInner>,
    pump: Option<JoinHandle<()>>,
    _detach: DropGuard,
}

struct StreamInner {
    conversation_id: ConversationId,
    me: UserId,
    store: Arc<dyn MessageStore>,
    state: watch::Sender<StreamView>,
    sends_in_flight: AtomicUsize,
    history_limit: HistoryLimit,
    errors: Arc<dyn ErrorSink>,
    detached: CancellationToken,
}

impl MessageStream {
    pub async fn open(
        conversation_id: ConversationId,
        me: UserId,
        store: Arc<dyn MessageStore>,
        channel: &dyn PushChannel,
        errors: Arc<dyn ErrorSink>,
        config: MessageStreamConfig,
    ) -> Result<Self, ChatError> {
        let topic = ChangeTopic::filtered(
            MESSAGES_TABLE,
            RowFilter::eq("conversation_id", conversation_id),
        );
        let subscription = channel
            .subscribe(topic)
            .await
            .map_err(|e| ChatError::Subscribe(e.to_string()))?;

        let (state, _) = watch::channel(StreamView {
            messages: Vec::new(),
            loading: true,
            sending: false,
        });
        let detached = CancellationToken::new();
        let inner = Arc::new(StreamInner {
            conversation_id,
            me,
            store,
            state,
            sends_in_flight: AtomicUsize::new(0),
            history_limit: config.history_limit,
            errors,
            detached: detached.clone(),
        });

        let pump = tokio::spawn(inner.clone().run(subscription));
        info!(%conversation_id, %me, "message stream opened");

        Ok(Self {
            inner,
            pump: Some(pump),
            _detach: detached.drop_guard(),
        })
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.inner.conversation_id
    }

    pub fn view(&self) -> StreamView {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<StreamView> {
        self.inner.state.subscribe()
    }

    pub async fn loaded(&self) -> StreamView {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(|view| !view.loading).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    /// Held messages newer than the window survive. On failure the list is kept.
    pub async fn refresh(&self) -> Result<(), ChatError> {
        self.inner.state.send_modify(|view| view.loading = true);
        self.inner.load_history().await
    }

    pub async fn send_text(&self, text: &str) -> Result<Message, ChatError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.inner
            .send(MessageBody::Text {
                content: content.to_owned(),
            })
            .await
    }

    /// `uri` points at an already uploaded image.
    pub async fn send_image(&self, uri: &str) -> Result<Message, ChatError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ChatError::EmptyImageUri);
        }
        self.inner
            .send(MessageBody::Image {
                uri: uri.to_owned(),
            })
            .await
    }

    pub async fn send_post_share(&self, post_id: PostId) -> Result<Message, ChatError> {
        self.inner.send(MessageBody::PostShare { post_id }).await
    }

    pub async fn send_event_share(&self, event_id: EventId) -> Result<Message, ChatError> {
        self.inner.send(MessageBody::EventShare { event_id }).await
    }

    pub async fn close(mut self) {
        self.inner.detached.cancel();
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!(conversation_id = %self.inner.conversation_id, "stream pump ended abnormally: {e}");
            }
        }
        info!(conversation_id = %self.inner.conversation_id, "message stream closed");
    }
}

/// Keeps `sending` true while at least one send is outstanding.
struct SendingGuard<'a> {
    inner: &'a StreamInner,
}

impl<'a> SendingGuard<'a> {
    fn enter(inner: &'a StreamInner) -> Self {
        inner.state.send_modify(|view| {
            let in_flight = inner.sends_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            view.sending = in_flight > 0;
        });
        Self { inner }
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        let inner = self.inner;
        inner.state.send_modify(|view| {
            let in_flight = inner.sends_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            view.sending = in_flight > 0;
        });
    }
}

impl StreamInner {
    async fn run(self: Arc<Self>, mut subscription: Subscription) {
        if let Err(e) = self.load_history().await {
            warn!(conversation_id = %self.conversation_id, "initial history load failed: {e}");
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = self.detached.cancelled() => break,
                event = subscription.next() => event,
            };
            let Some(event) = event else {
                warn!(conversation_id = %self.conversation_id, "change feed closed");
                break;
            };
            self.apply_change(event).await;
        }

        debug!(conversation_id = %self.conversation_id, topic = %subscription.topic(), "releasing subscription");
    }

    async fn load_history(&self) -> Result<(), ChatError> {
        let fetched = self
            .store
            .fetch_messages(self.conversation_id, self.history_limit)
            .await;
        if self.detached.is_cancelled() {
            return Ok(());
        }

        match fetched {
            Ok(mut window) => {
                window.sort_by_key(Message::order_key);
                let fetched_count = window.len();
                self.state.send_modify(|view| {
                    let held = std::mem::take(&mut view.messages);
                    view.messages = merge_window(window, held);
                });
                debug!(conversation_id = %self.conversation_id, fetched_count, "history loaded");
                // `loading` clears only once the read mark has settled
                self.mark_read_if_unread().await;
                self.state.send_modify(|view| view.loading = false);
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|view| view.loading = false);
                Err(e)
            }
        }
    }

    async fn mark_read_if_unread(&self) {
        let unread = self
            .state
            .borrow()
            .messages
            .iter()
            .any(|m| !m.read && m.sender_id != self.me);
        if unread {
            self.mark_read().await;
        }
    }

    async fn mark_read(&self) {
        if let Err(e) = self.store.mark_read(self.conversation_id, self.me).await {
            warn!(conversation_id = %self.conversation_id, "mark read failed: {e}");
        }
    }

    async fn apply_change(&self, event: ChangeEvent) {
        let row = match serde_json::from_value::<MessageRow>(event.record.clone()) {
            Ok(row) => row,
            Err(e) => {
                warn!(conversation_id = %self.conversation_id, "{}", PushError::Malformed(e.to_string()));
                return;
            }
        };
        trace!(conversation_id = %self.conversation_id, kind = ?event.kind, message_id = %row.id, "change received");

        match event.kind {
            ChangeKind::Insert => self.apply_insert(row, event.record).await,
            ChangeKind::Update => self.apply_update(row),
        }
    }

    // delivery order, not created_at
    async fn apply_insert(&self, row: MessageRow, record: serde_json::Value) {
        let already_held = self
            .state
            .borrow()
            .messages
            .iter()
            .any(|m| m.id == row.id);
        if already_held {
            trace!(message_id = %row.id, "insert already held, skipped");
            return;
        }

        let message = match self.store.fetch_message(row.id).await {
            Ok(message) => message,
            // the feed may carry the whole row
            Err(e) => match serde_json::from_value::<Message>(record) {
                Ok(message) => {
                    debug!(message_id = %row.id, "projection fetch failed, using pushed row: {e}");
                    message
                }
                Err(_) => {
                    warn!(message_id = %row.id, "insert dropped, projection unavailable: {e}");
                    return;
                }
            },
        };
        if self.detached.is_cancelled() {
            return;
        }

        let sender_id = message.sender_id;
        let appended = self.state.send_if_modified(|view| {
            if view.messages.iter().any(|m| m.id == message.id) {
                return false;
            }
            view.messages.push(message);
            true
        });
        if appended && sender_id != self.me {
            self.mark_read().await;
        }
    }

    fn apply_update(&self, row: MessageRow) {
        let Some(read) = row.read else {
            trace!(message_id = %row.id, "update without read flag ignored");
            return;
        };
        let changed = self.state.send_if_modified(|view| {
            match view.messages.iter_mut().find(|m| m.id == row.id) {
                Some(message) if message.read != read => {
                    message.read = read;
                    true
                }
                _ => false,
            }
        });
        trace!(message_id = %row.id, read, changed, "update applied");
    }

    async fn send(&self, body: MessageBody) -> Result<Message, ChatError> {
        let message_type = body.message_type();
        let draft = MessageDraft {
            conversation_id: self.conversation_id,
            sender_id: self.me,
            body,
        };

        let _sending = SendingGuard::enter(self);
        // the created row comes back through the change feed like any other insert
        match self.store.send_message(&draft).await {
            Ok(message) => {
                debug!(conversation_id = %self.conversation_id, message_id = %message.id, ?message_type, "message sent");
                Ok(message)
            }
            Err(error) => {
                warn!(conversation_id = %self.conversation_id, ?message_type, "send failed: {error}");
                self.errors.report(&EngineError::Chat {
                    conversation_id: self.conversation_id,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

/// Window first, then held messages newer than it.
fn merge_window(mut window: Vec<Message>, held: Vec<Message>) -> Vec<Message> {
    let newest = window.last().map(Message::order_key);
    let fetched: HashSet<MessageId> = window.iter().map(|m| m.id).collect();
    window.extend(held.into_iter().filter(|m| {
        !fetched.contains(&m.id) && newest.is_none_or(|newest| m.order_key() > newest)
    }));
    window
}
