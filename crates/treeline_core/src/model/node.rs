//! Tree node domain model.
//!
//! # Responsibility
//! - Define the canonical node record owned by the tree document.
//! - Define read-only snapshot shapes handed to callers.
//!
//! # Invariants
//! - `id` is stable and never reused for another node.
//! - Child order is insertion/display order.
//! - Snapshots are detached copies; holding one never borrows the tree.

use crate::model::format::FieldValue;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable node identifier.
pub type NodeId = Uuid;

/// Typed node field data keyed by field name.
pub type NodeData = BTreeMap<String, FieldValue>;

/// Canonical node record.
///
/// Fields are crate-private so structural changes always pass through
/// `TreeDocument`, which owns the parent/child invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) title: String,
    pub(crate) format_type: Option<String>,
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format_type(&self) -> Option<&str> {
        self.format_type.as_deref()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Parent id. `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Data rendered in canonical text form.
    pub fn data_text(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .map(|(name, value)| (name.clone(), value.to_text()))
            .collect()
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id,
            title: self.title.clone(),
            format_type: self.format_type.clone(),
        }
    }
}

/// Content for a node that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDraft {
    pub title: String,
    pub format_type: Option<String>,
    pub data: NodeData,
}

impl NodeDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            format_type: None,
            data: NodeData::new(),
        }
    }
}

/// `{id, title, format_type}` metadata view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub title: String,
    pub format_type: Option<String>,
}

/// Depth-bounded snapshot of one node and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub title: String,
    pub format_type: Option<String>,
    /// Field values in canonical text form.
    pub data: BTreeMap<String, String>,
    pub parent_id: Option<NodeId>,
    /// Index within the parent's children. `None` for the root.
    pub position: Option<usize>,
    /// Number of direct children, whether or not they are included.
    pub child_count: usize,
    pub children: Vec<NodeSnapshot>,
    /// True when children exist but were cut off by the depth bound.
    pub has_more_children: bool,
}
