//! Runs the in-memory backends end to end and logs what a UI would render.
//!
//! $ cargo run --bin stream_demo

use interplay::application_impl::*;
use interplay::application_port::*;
use interplay::domain_model::*;
use interplay::domain_port::*;
use interplay::infra_memory::*;
use interplay::logger::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "interplay=debug,stream_demo=debug".to_string(),
    })?;

    let hub = InMemoryPushHub::new();
    let store = Arc::new(InMemoryRemoteStore::new(hub.clone()).with_latency(Duration::from_millis(150)));
    let errors: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink);

    let alice = UserId(uuid::Uuid::new_v4());
    let bob = UserId(uuid::Uuid::new_v4());
    for (user_id, username) in [(alice, "alice"), (bob, "bob")] {
        store.register_profile(SenderProfile {
            user_id,
            username: username.to_string(),
            avatar_url: None,
        });
    }

    // follow: one confirmed toggle, then one that the remote rejects
    let follow = FollowToggle::new(
        FollowRelation::new(store.clone()),
        Some(alice),
        Some(bob),
        Some(41),
        errors.clone(),
    );
    info!(view = ?follow.settled().await, "follow status checked");

    if let Some(pending) = follow.toggle() {
        info!(view = ?follow.view(), "follow optimistic");
        info!(result = ?pending.settled().await, "follow settled");
    }

    store.fail_next_mutation("follow limit reached");
    if let Some(pending) = follow.toggle() {
        info!(view = ?follow.view(), "unfollow optimistic");
        info!(result = ?pending.settled().await, "unfollow settled");
    }
    info!(view = ?follow.view(), "follow after rollback");

    // conversation: alice watches while bob writes
    let conversation_id = ConversationId(uuid::Uuid::new_v4());
    let stream = MessageStream::open(
        conversation_id,
        alice,
        store.clone(),
        &hub,
        errors.clone(),
        MessageStreamConfig::default(),
    )
    .await?;
    stream.loaded().await;

    let bob_draft = MessageDraft {
        conversation_id,
        sender_id: bob,
        body: MessageBody::Text {
            content: "are you coming tonight?".to_string(),
        },
    };
    store.send_message(&bob_draft).await?;
    stream.send_text("on my way").await?;
    stream.send_post_share(PostId(uuid::Uuid::new_v4())).await?;

    let mut views = stream.watch();
    let merged = tokio::time::timeout(
        Duration::from_secs(5),
        views.wait_for(|view| view.messages.len() == 3 && view.messages[0].read),
    )
    .await;
    if merged.is_err() {
        warn!("push merge did not settle in time");
    }
    drop(merged);
    drop(views);

    for message in stream.view().messages {
        let from = message
            .sender
            .as_ref()
            .map(|s| s.username.as_str())
            .unwrap_or("?");
        info!(from, read = message.read, body = ?message.body, "message");
    }

    if let Err(e) = stream.send_text("   ").await {
        info!("blank send rejected: {e}");
    }

    stream.close().await;
    info!(subscribers = hub.subscriber_count(), "done");

    Ok(())
}
