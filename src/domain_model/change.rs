use serde::{Deserialize, Serialize};
use std::fmt;

pub const MESSAGES_TABLE: &str = "messages";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// Row-level change delivered by a push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    pub record: serde_json::Value,
}

/// Equality filter on one column, rendered as `column=eq.value`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: &str, value: impl fmt::Display) -> Self {
        Self {
            column: column.to_owned(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, record: &serde_json::Value) -> bool {
        match record.get(&self.column) {
            Some(serde_json::Value::String(s)) => *s == self.value,
            Some(serde_json::Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// Subscription key: table plus optional row filter.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ChangeTopic {
    pub table: String,
    pub filter: Option<RowFilter>,
}

impl ChangeTopic {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            filter: None,
        }
    }

    pub fn filtered(table: &str, filter: RowFilter) -> Self {
        Self {
            table: table.to_owned(),
            filter: Some(filter),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match &self.filter {
            Some(filter) => filter.matches(&event.record),
            None => true,
        }
    }
}

impl fmt::Display for ChangeTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}?{}", self.table, filter),
            None => f.write_str(&self.table),
        }
    }
}
