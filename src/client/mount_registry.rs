use crate::application_impl::MessageStream;
use crate::client::MountedToggle;
use dashmap::DashMap;
use nanoid::nanoid;
use std::sync::Arc;

/// Opaque handles for everything a host has mounted. Each mount is its own
/// controller; nothing is shared between handles.
#[derive(Default)]
pub struct MountRegistry {
    toggles: DashMap<String, Arc<dyn MountedToggle>>,
    streams: DashMap<String, Arc<MessageStream>>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_toggle(&self, toggle: Arc<dyn MountedToggle>) -> String {
        let handle = nanoid!();
        self.toggles.insert(handle.clone(), toggle);
        handle
    }

    pub fn toggle(&self, handle: &str) -> Option<Arc<dyn MountedToggle>> {
        self.toggles.get(handle).map(|t| t.value().clone())
    }

    pub fn remove_toggle(&self, handle: &str) -> Option<Arc<dyn MountedToggle>> {
        self.toggles.remove(handle).map(|(_, t)| t)
    }

    pub fn insert_stream(&self, stream: MessageStream) -> String {
        let handle = nanoid!();
        self.streams.insert(handle.clone(), Arc::new(stream));
        handle
    }

    pub fn stream(&self, handle: &str) -> Option<Arc<MessageStream>> {
        self.streams.get(handle).map(|s| s.value().clone())
    }

    pub fn remove_stream(&self, handle: &str) -> Option<Arc<MessageStream>> {
        self.streams.remove(handle).map(|(_, s)| s)
    }

    pub fn drain_streams(&self) -> Vec<Arc<MessageStream>> {
        let handles: Vec<String> = self.streams.iter().map(|s| s.key().clone()).collect();
        handles
            .iter()
            .filter_map(|handle| self.remove_stream(handle))
            .collect()
    }

    pub fn clear_toggles(&self) -> usize {
        let count = self.toggles.len();
        self.toggles.clear();
        count
    }

    pub fn toggle_count(&self) -> usize {
        self.toggles.len()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}
