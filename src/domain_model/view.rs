use crate::domain_model::*;
use serde::Serialize;

/// What a toggle exposes to the UI.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ToggleView {
    pub active: bool,
    pub count: u64,
    pub pending: bool,
    pub attrs: Option<RelationAttrs>,
}

/// What a message stream exposes to the UI.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamView {
    pub messages: Vec<Message>,
    pub loading: bool,
    pub sending: bool,
}
