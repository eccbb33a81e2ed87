//! In-memory tree document store.
//!
//! # Responsibility
//! - Hold the canonical node hierarchy plus an id index.
//! - Provide insert, remove-subtree, reparent and content replacement primitives.
//!
//! # Invariants
//! - Exactly one root; every other node has exactly one parent.
//! - The hierarchy is acyclic and connected from the root.
//! - Every primitive validates before committing; a failed call leaves the
//!   tree unchanged.
//! - Traversal order is depth-first, children in stored order.

use crate::model::node::{Node, NodeData, NodeDraft, NodeId, NodeSnapshot};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by tree document operations.
pub type TreeRepoResult<T> = Result<T, TreeRepoError>;

/// Errors from tree document primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRepoError {
    /// Target node does not exist.
    NodeNotFound(NodeId),
    /// The root cannot be removed.
    RootNotRemovable(NodeId),
    /// The root cannot be given a parent.
    RootNotMovable(NodeId),
    /// Reparent would place a node under itself or its own descendant.
    CycleDetected { node_id: NodeId, parent_id: NodeId },
}

impl Display for TreeRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::RootNotRemovable(id) => write!(f, "root node cannot be deleted: {id}"),
            Self::RootNotMovable(id) => write!(f, "root node cannot be moved: {id}"),
            Self::CycleDetected { node_id, parent_id } => write!(
                f,
                "move would create cycle: node {node_id} under parent {parent_id}"
            ),
        }
    }
}

impl Error for TreeRepoError {}

/// Canonical in-memory tree.
#[derive(Debug, Clone)]
pub struct TreeDocument {
    nodes: HashMap<NodeId, Node>,
    root_id: NodeId,
}

impl TreeDocument {
    /// Creates a tree holding only an untyped root node.
    pub fn new(root_title: impl Into<String>) -> Self {
        let root_id = Uuid::new_v4();
        let root = Node {
            id: root_id,
            title: root_title.into(),
            format_type: None,
            data: NodeData::new(),
            parent: None,
            children: Vec::new(),
        };
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self { nodes, root_id }
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Returns the index of `node_id` within its parent's children.
    pub fn position_of(&self, node_id: NodeId) -> Option<usize> {
        let parent_id = self.nodes.get(&node_id)?.parent?;
        self.nodes
            .get(&parent_id)?
            .children
            .iter()
            .position(|child| *child == node_id)
    }

    /// Returns whether `ancestor_id` lies on the parent chain of `node_id`.
    ///
    /// A node is not its own ancestor.
    pub fn is_ancestor(&self, ancestor_id: NodeId, node_id: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = self.nodes.get(&node_id).and_then(|node| node.parent);
        while let Some(current) = cursor {
            if current == ancestor_id {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        false
    }

    /// Returns ancestors from the root down to the direct parent.
    pub fn ancestors(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(&node_id).and_then(|node| node.parent);
        while let Some(current) = cursor {
            if chain.contains(&current) {
                break;
            }
            chain.push(current);
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        chain.reverse();
        chain
    }

    /// Returns every node in depth-first order, children in stored order.
    pub fn traverse(&self) -> Vec<&Node> {
        self.traverse_from(self.root_id)
    }

    /// Returns the subtree rooted at `node_id` in depth-first order.
    pub fn traverse_from(&self, node_id: NodeId) -> Vec<&Node> {
        let mut ordered = Vec::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            ordered.push(node);
            stack.extend(node.children.iter().rev().copied());
        }
        ordered
    }

    /// Inserts a new child under `parent_id`.
    ///
    /// `position` defaults to end-of-children; out-of-range values clamp to
    /// the end. Returns the new id and the applied position.
    pub fn insert_child(
        &mut self,
        parent_id: NodeId,
        draft: NodeDraft,
        position: Option<usize>,
    ) -> TreeRepoResult<(NodeId, usize)> {
        let parent = self
            .nodes
            .get_mut(&parent_id)
            .ok_or(TreeRepoError::NodeNotFound(parent_id))?;

        let node_id = Uuid::new_v4();
        let index = clamp_position(position, parent.children.len());
        parent.children.insert(index, node_id);

        self.nodes.insert(
            node_id,
            Node {
                id: node_id,
                title: draft.title,
                format_type: draft.format_type,
                data: draft.data,
                parent: Some(parent_id),
                children: Vec::new(),
            },
        );
        Ok((node_id, index))
    }

    /// Removes `node_id` and its entire subtree.
    ///
    /// Returns removed ids in depth-first order, `node_id` first.
    pub fn remove_subtree(&mut self, node_id: NodeId) -> TreeRepoResult<Vec<NodeId>> {
        let parent_id = match self.nodes.get(&node_id) {
            None => return Err(TreeRepoError::NodeNotFound(node_id)),
            Some(node) => node.parent.ok_or(TreeRepoError::RootNotRemovable(node_id))?,
        };

        let removed: Vec<NodeId> = self
            .traverse_from(node_id)
            .into_iter()
            .map(Node::id)
            .collect();

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.retain(|child| *child != node_id);
        }
        for id in &removed {
            self.nodes.remove(id);
        }
        Ok(removed)
    }

    /// Moves `node_id` under `new_parent_id` at `position`.
    ///
    /// The node is detached before `position` is applied, so moving within
    /// the same parent indexes into the remaining siblings. Returns the
    /// applied position.
    pub fn reparent(
        &mut self,
        node_id: NodeId,
        new_parent_id: NodeId,
        position: Option<usize>,
    ) -> TreeRepoResult<usize> {
        let old_parent_id = match self.nodes.get(&node_id) {
            None => return Err(TreeRepoError::NodeNotFound(node_id)),
            Some(node) => node.parent.ok_or(TreeRepoError::RootNotMovable(node_id))?,
        };
        if !self.nodes.contains_key(&new_parent_id) {
            return Err(TreeRepoError::NodeNotFound(new_parent_id));
        }
        if new_parent_id == node_id || self.is_ancestor(node_id, new_parent_id) {
            return Err(TreeRepoError::CycleDetected {
                node_id,
                parent_id: new_parent_id,
            });
        }

        let mut siblings = self
            .nodes
            .get(&new_parent_id)
            .map(|parent| parent.children.clone())
            .unwrap_or_default();
        siblings.retain(|id| *id != node_id);
        let index = clamp_position(position, siblings.len());
        siblings.insert(index, node_id);

        if old_parent_id != new_parent_id {
            if let Some(old_parent) = self.nodes.get_mut(&old_parent_id) {
                old_parent.children.retain(|id| *id != node_id);
            }
        }
        if let Some(new_parent) = self.nodes.get_mut(&new_parent_id) {
            new_parent.children = siblings;
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent = Some(new_parent_id);
        }
        Ok(index)
    }

    /// Replaces title, format type and data of one node in a single step.
    pub fn replace_content(
        &mut self,
        node_id: NodeId,
        title: String,
        format_type: Option<String>,
        data: NodeData,
    ) -> TreeRepoResult<()> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(TreeRepoError::NodeNotFound(node_id))?;
        node.title = title;
        node.format_type = format_type;
        node.data = data;
        Ok(())
    }

    /// Builds a snapshot including children down to `depth` levels.
    ///
    /// `depth == 0` includes no children; `has_more_children` then reports
    /// whether any were cut off.
    pub fn snapshot(&self, node_id: NodeId, depth: usize) -> Option<NodeSnapshot> {
        let node = self.nodes.get(&node_id)?;
        let children = if depth > 0 {
            node.children
                .iter()
                .filter_map(|child| self.snapshot(*child, depth - 1))
                .collect()
        } else {
            Vec::new()
        };

        Some(NodeSnapshot {
            id: node.id,
            title: node.title.clone(),
            format_type: node.format_type.clone(),
            data: node.data_text(),
            parent_id: node.parent,
            position: self.position_of(node_id),
            child_count: node.children.len(),
            children,
            has_more_children: depth == 0 && !node.children.is_empty(),
        })
    }
}

fn clamp_position(position: Option<usize>, len: usize) -> usize {
    position.unwrap_or(len).min(len)
}
