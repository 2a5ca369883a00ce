use crate::application_port::*;
use std::sync::Mutex;

/// Logs every reported failure.
#[derive(Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, error: &EngineError) {
        tracing::warn!(%error, "operation rolled back");
    }
}

/// Keeps reported failures until the host drains them into notifications.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    reported: Mutex<Vec<EngineError>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<EngineError> {
        match self.reported.lock() {
            Ok(mut reported) => std::mem::take(&mut *reported),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.reported.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, error: &EngineError) {
        tracing::warn!(%error, "operation failed, queued for the host");
        if let Ok(mut reported) = self.reported.lock() {
            reported.push(error.clone());
        }
    }
}
