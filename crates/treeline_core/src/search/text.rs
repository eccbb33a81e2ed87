//! Text search over titles and field values.
//!
//! # Responsibility
//! - Find nodes whose title and/or field values contain the query text.
//! - Return typed hits with stable ids in tree traversal order.
//!
//! # Invariants
//! - Blank query text is rejected, never treated as match-all.
//! - Word mode is case-insensitive and order-independent.
//! - Exact mode matches the whole query as one contiguous, case-sensitive substring.
//! - Results are fully materialized; search never mutates the tree.

use crate::model::node::{Node, NodeId, NodeSnapshot};
use crate::repo::tree_repo::TreeDocument;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Scanned-field name used for the node title.
pub const TITLE_FIELD: &str = "title";

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Query text is empty after trimming.
    EmptyQuery,
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "search_text must not be empty"),
        }
    }
}

impl Error for SearchError {}

/// Search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Scan titles only instead of titles plus every field value.
    pub title_only: bool,
    /// Match the full text contiguously instead of word-by-word.
    pub exact_match: bool,
    /// Return full node snapshots instead of metadata hits.
    pub return_nodes: bool,
}

impl SearchQuery {
    /// Creates a word-mode query over titles and field values.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            title_only: false,
            exact_match: false,
            return_nodes: false,
        }
    }
}

/// Metadata hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: NodeId,
    pub title: String,
    pub format_type: Option<String>,
    /// Scanned fields that matched, in scan order (`title` first).
    pub matched_fields: Vec<String>,
}

/// One search result, shaped by `SearchQuery::return_nodes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchMatch {
    Metadata(SearchHit),
    Node(NodeSnapshot),
}

impl SearchMatch {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Metadata(hit) => hit.id,
            Self::Node(snapshot) => snapshot.id,
        }
    }
}

/// Scans the whole tree and returns matches in traversal order.
///
/// `snapshot_depth` bounds children included in full node results.
pub fn search_nodes(
    tree: &TreeDocument,
    query: &SearchQuery,
    snapshot_depth: usize,
) -> SearchResult<Vec<SearchMatch>> {
    let text = query.text.trim();
    if text.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    let matcher = Matcher::new(text, query.exact_match);

    let mut matches = Vec::new();
    for node in tree.traverse() {
        let fields = scanned_fields(node, query.title_only);
        let Some(matched_fields) = matcher.matched_fields(&fields) else {
            continue;
        };

        if query.return_nodes {
            if let Some(snapshot) = tree.snapshot(node.id(), snapshot_depth) {
                matches.push(SearchMatch::Node(snapshot));
            }
        } else {
            matches.push(SearchMatch::Metadata(SearchHit {
                id: node.id(),
                title: node.title().to_string(),
                format_type: node.format_type().map(str::to_string),
                matched_fields,
            }));
        }
    }
    Ok(matches)
}

enum Matcher {
    Exact(String),
    Words(Vec<String>),
}

impl Matcher {
    fn new(text: &str, exact_match: bool) -> Self {
        if exact_match {
            Self::Exact(text.to_string())
        } else {
            Self::Words(text.split_whitespace().map(str::to_lowercase).collect())
        }
    }

    /// Returns matched field names, or `None` when the node does not match.
    fn matched_fields(&self, fields: &[(String, String)]) -> Option<Vec<String>> {
        match self {
            Self::Exact(needle) => {
                let hits: Vec<String> = fields
                    .iter()
                    .filter(|(_, text)| text.contains(needle.as_str()))
                    .map(|(name, _)| name.clone())
                    .collect();
                (!hits.is_empty()).then_some(hits)
            }
            Self::Words(tokens) => {
                let folded: Vec<(&str, String)> = fields
                    .iter()
                    .map(|(name, text)| (name.as_str(), text.to_lowercase()))
                    .collect();
                let mut hit_flags = vec![false; folded.len()];
                for token in tokens {
                    let mut token_found = false;
                    for (index, (_, text)) in folded.iter().enumerate() {
                        if text.contains(token.as_str()) {
                            hit_flags[index] = true;
                            token_found = true;
                        }
                    }
                    if !token_found {
                        return None;
                    }
                }
                Some(
                    folded
                        .iter()
                        .zip(hit_flags)
                        .filter(|(_, hit)| *hit)
                        .map(|((name, _), _)| (*name).to_string())
                        .collect(),
                )
            }
        }
    }
}

fn scanned_fields(node: &Node, title_only: bool) -> Vec<(String, String)> {
    let mut fields = vec![(TITLE_FIELD.to_string(), node.title().to_string())];
    if !title_only {
        fields.extend(node.data_text());
    }
    fields
}
