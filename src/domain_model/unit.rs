use serde::Deserialize;

/// Upper bound for a bounded history fetch.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Deserialize)]
#[serde(transparent)]
pub struct HistoryLimit(pub u16);

impl HistoryLimit {
    pub const DEFAULT: HistoryLimit = HistoryLimit(50);
}

impl Default for HistoryLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}
