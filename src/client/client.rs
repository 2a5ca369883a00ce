use crate::application_impl::*;
use crate::application_port::*;
use crate::client::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_http::*;
use crate::infra_kafka::*;
use crate::infra_memory::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use nanoid::nanoid;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct StreamMount {
    pub conversation_id: ConversationId,
    pub me: UserId,
}

/// Owns the wired backends and every mounted controller.
pub struct Client {
    relation_store: Arc<dyn RelationStore>,
    message_store: Arc<dyn MessageStore>,
    push_channel: Arc<dyn PushChannel>,
    notifications: Arc<CollectingErrorSink>,
    stream_config: MessageStreamConfig,
    mounts: MountRegistry,
}

impl Client {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        let run_id = nanoid!(10, &alphabet);
        let hub = InMemoryPushHub::new();

        let (relation_store, message_store): (Arc<dyn RelationStore>, Arc<dyn MessageStore>) =
            match settings.remote.backend.as_str() {
                "fake" => {
                    let store = Arc::new(InMemoryRemoteStore::new(hub.clone()));
                    (store.clone() as Arc<dyn RelationStore>, store as Arc<dyn MessageStore>)
                }
                "http" => {
                    let base_url = settings
                        .remote
                        .base_url
                        .as_deref()
                        .ok_or_else(|| anyhow!("remote.base_url is required for the http backend"))?;
                    let store = Arc::new(HttpRemoteStore::try_new(base_url)?);
                    (store.clone() as Arc<dyn RelationStore>, store as Arc<dyn MessageStore>)
                }
                other => return Err(anyhow!("Unknown remote backend: {}", other)),
            };

        let push_channel: Arc<dyn PushChannel> = match settings.push.backend.as_str() {
            "fake" => {
                if settings.remote.backend != "fake" {
                    warn!("fake push channel only carries changes made through the fake remote");
                }
                Arc::new(hub)
            }
            "kafka" => {
                let bootstrap = settings
                    .push
                    .bootstrap_servers
                    .as_deref()
                    .ok_or_else(|| anyhow!("push.bootstrap_servers is required for kafka"))?;
                let topic = settings
                    .push
                    .topic
                    .as_deref()
                    .ok_or_else(|| anyhow!("push.topic is required for kafka"))?;
                Arc::new(KafkaPushChannel::new(
                    bootstrap,
                    topic,
                    &format!("interplay-{run_id}"),
                ))
            }
            other => return Err(anyhow!("Unknown push backend: {}", other)),
        };

        info!(
            %run_id,
            remote = %settings.remote.backend,
            push = %settings.push.backend,
            "client wired"
        );

        Ok(Self::from_parts(
            relation_store,
            message_store,
            push_channel,
            MessageStreamConfig {
                history_limit: settings.messages.history_limit(),
            },
        ))
    }

    pub fn from_parts(
        relation_store: Arc<dyn RelationStore>,
        message_store: Arc<dyn MessageStore>,
        push_channel: Arc<dyn PushChannel>,
        stream_config: MessageStreamConfig,
    ) -> Self {
        Self {
            relation_store,
            message_store,
            push_channel,
            notifications: Arc::new(CollectingErrorSink::new()),
            stream_config,
            mounts: MountRegistry::new(),
        }
    }

    // region toggles

    pub fn mount_toggle(&self, mount: &ToggleMount) -> (String, ToggleView) {
        let toggle = mount.build(self.relation_store.clone(), self.notifications.clone());
        let view = toggle.view();
        let handle = self.mounts.insert_toggle(toggle);
        debug!(%handle, kind = %mount.kind, "toggle mounted");
        (handle, view)
    }

    pub fn toggle(&self, handle: &str) -> Option<Arc<dyn MountedToggle>> {
        self.mounts.toggle(handle)
    }

    /// In-flight results for the toggle are discarded once it is unmounted.
    pub fn unmount_toggle(&self, handle: &str) -> bool {
        let removed = self.mounts.remove_toggle(handle).is_some();
        debug!(%handle, removed, "toggle unmounted");
        removed
    }

    // endregion

    // region streams

    pub async fn open_stream(&self, mount: StreamMount) -> Result<(String, StreamView), ChatError> {
        let stream = MessageStream::open(
            mount.conversation_id,
            mount.me,
            self.message_store.clone(),
            self.push_channel.as_ref(),
            self.notifications.clone(),
            self.stream_config,
        )
        .await?;
        let view = stream.view();
        let handle = self.mounts.insert_stream(stream);
        debug!(%handle, conversation_id = %mount.conversation_id, "stream mounted");
        Ok((handle, view))
    }

    pub fn stream(&self, handle: &str) -> Option<Arc<MessageStream>> {
        self.mounts.stream(handle)
    }

    pub async fn close_stream(&self, handle: &str) -> bool {
        match self.mounts.remove_stream(handle) {
            Some(stream) => {
                close_shared(stream).await;
                true
            }
            None => false,
        }
    }

    // endregion

    /// Failures reported since the last call, oldest first.
    pub fn drain_notifications(&self) -> Vec<EngineError> {
        self.notifications.drain()
    }

    pub async fn shutdown(&self) {
        info!("client shutting down...");
        let toggles = self.mounts.clear_toggles();
        let streams = self.mounts.drain_streams();
        let stream_count = streams.len();
        for stream in streams {
            close_shared(stream).await;
        }
        info!(toggles, streams = stream_count, "all mounts released");
    }
}

/// A request may still hold the stream; its guard releases the
/// subscription once the last holder lets go.
async fn close_shared(stream: Arc<MessageStream>) {
    match Arc::try_unwrap(stream) {
        Ok(stream) => stream.close().await,
        Err(shared) => drop(shared),
    }
}
