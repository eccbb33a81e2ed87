//! Node reference resolution.
//!
//! # Responsibility
//! - Turn a caller reference (id, title or absent) into exactly one node.
//!
//! # Invariants
//! - Tier order is fixed: exact id, exact title, case-insensitive title.
//! - A tier with more than one candidate fails instead of falling through.
//! - Resolution never mutates the tree.
//! - Candidates are reported in tree traversal order.

use crate::model::node::{Node, NodeId};
use crate::repo::tree_repo::TreeDocument;
use crate::service::session::SessionContext;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No node matches the reference.
    NodeNotFound(String),
    /// More than one node matches within the winning tier.
    AmbiguousReference {
        reference: String,
        candidates: Vec<NodeId>,
    },
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(reference) => write!(f, "node not found: {reference}"),
            Self::AmbiguousReference {
                reference,
                candidates,
            } => {
                let ids = candidates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "reference `{reference}` matches {} nodes; use one of the ids: {ids}",
                    candidates.len()
                )
            }
        }
    }
}

impl Error for ResolveError {}

/// Two-tier resolver over one tree document.
pub struct NodeResolver<'a> {
    tree: &'a TreeDocument,
}

impl<'a> NodeResolver<'a> {
    pub fn new(tree: &'a TreeDocument) -> Self {
        Self { tree }
    }

    /// Resolves a reference by id first, then by title.
    pub fn resolve(&self, reference: &str) -> Result<NodeId, ResolveError> {
        let reference = reference.trim();
        if let Some(node_id) = self.resolve_id(reference) {
            return Ok(node_id);
        }
        self.resolve_title(reference)
    }

    /// Resolves an optional reference, falling back to the session selection.
    ///
    /// With no reference and no selection the root is used. A selection that
    /// no longer exists fails with `NodeNotFound`.
    pub fn resolve_or_selected(
        &self,
        reference: Option<&str>,
        session: &SessionContext,
    ) -> Result<NodeId, ResolveError> {
        match reference.map(str::trim).filter(|value| !value.is_empty()) {
            Some(reference) => self.resolve(reference),
            None => match session.selected() {
                Some(selected) if self.tree.contains(selected) => Ok(selected),
                Some(selected) => Err(ResolveError::NodeNotFound(selected.to_string())),
                None => Ok(self.tree.root_id()),
            },
        }
    }

    /// Resolves by title only: exact match, then case-insensitive match.
    pub fn resolve_title(&self, title: &str) -> Result<NodeId, ResolveError> {
        let title = title.trim();
        let nodes = self.tree.traverse();

        let exact = collect_ids(&nodes, |node| node.title() == title);
        if let Some(node_id) = single_candidate(title, exact)? {
            return Ok(node_id);
        }

        let folded = title.to_lowercase();
        let insensitive = collect_ids(&nodes, |node| node.title().to_lowercase() == folded);
        if let Some(node_id) = single_candidate(title, insensitive)? {
            return Ok(node_id);
        }

        Err(ResolveError::NodeNotFound(title.to_string()))
    }

    fn resolve_id(&self, reference: &str) -> Option<NodeId> {
        let node_id = Uuid::parse_str(reference).ok()?;
        // Only the canonical hyphenated form counts as an id match.
        (node_id.to_string() == reference && self.tree.contains(node_id)).then_some(node_id)
    }
}

fn collect_ids(nodes: &[&Node], predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|node| predicate(node))
        .map(|node| node.id())
        .collect()
}

fn single_candidate(
    reference: &str,
    mut candidates: Vec<NodeId>,
) -> Result<Option<NodeId>, ResolveError> {
    match candidates.len() {
        0 => Ok(None),
        1 => Ok(candidates.pop()),
        _ => Err(ResolveError::AmbiguousReference {
            reference: reference.to_string(),
            candidates,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeResolver, ResolveError};
    use crate::model::node::NodeDraft;
    use crate::repo::tree_repo::TreeDocument;
    use crate::service::session::SessionContext;

    #[test]
    fn absent_reference_uses_selection_then_root() {
        let mut tree = TreeDocument::new("Root");
        let root = tree.root_id();
        let (a, _) = tree
            .insert_child(root, NodeDraft::new("A"), None)
            .expect("insert");
        let resolver = NodeResolver::new(&tree);

        assert_eq!(
            resolver.resolve_or_selected(None, &SessionContext::new()),
            Ok(root)
        );
        assert_eq!(
            resolver.resolve_or_selected(Some("  "), &SessionContext::with_selected(a)),
            Ok(a)
        );
    }

    #[test]
    fn stale_selection_is_not_found() {
        let mut tree = TreeDocument::new("Root");
        let root = tree.root_id();
        let (a, _) = tree
            .insert_child(root, NodeDraft::new("A"), None)
            .expect("insert");
        tree.remove_subtree(a).expect("remove");

        let resolver = NodeResolver::new(&tree);
        let err = resolver
            .resolve_or_selected(None, &SessionContext::with_selected(a))
            .expect_err("stale selection");
        assert!(matches!(err, ResolveError::NodeNotFound(_)));
    }

    #[test]
    fn reference_is_trimmed_before_matching() {
        let mut tree = TreeDocument::new("Root");
        let root = tree.root_id();
        let (a, _) = tree
            .insert_child(root, NodeDraft::new("Alpha"), None)
            .expect("insert");
        let resolver = NodeResolver::new(&tree);
        assert_eq!(resolver.resolve("  Alpha "), Ok(a));
        assert_eq!(resolver.resolve(&format!(" {a} ")), Ok(a));
    }
}
