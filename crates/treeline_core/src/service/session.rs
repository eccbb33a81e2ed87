//! Caller session context.
//!
//! The surrounding application owns the selection; the engine only reads it
//! and records the last node it created.

use crate::model::node::NodeId;

/// Session state threaded through every action call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    selected: Option<NodeId>,
    last_created: Option<NodeId>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with `node_id` selected.
    pub fn with_selected(node_id: NodeId) -> Self {
        Self {
            selected: Some(node_id),
            last_created: None,
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn select(&mut self, node_id: NodeId) {
        self.selected = Some(node_id);
    }

    pub fn last_created(&self) -> Option<NodeId> {
        self.last_created
    }

    pub fn record_created(&mut self, node_id: NodeId) {
        self.last_created = Some(node_id);
    }

    /// Drops references to nodes that no longer exist.
    pub fn forget_removed(&mut self, removed: &[NodeId]) {
        if self.selected.is_some_and(|id| removed.contains(&id)) {
            self.selected = None;
        }
        if self.last_created.is_some_and(|id| removed.contains(&id)) {
            self.last_created = None;
        }
    }
}
