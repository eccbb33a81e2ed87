//! Per-action results and error kinds.
//!
//! # Responsibility
//! - Define the closed set of caller-visible error kinds.
//! - Define kind-specific success payloads.
//! - Render one result slot as a stable JSON object.
//!
//! # Invariants
//! - Every lower-layer error maps to exactly one `ErrorKind`.
//! - Failure slots always carry `ok`, `status`, `error_kind` and `message`.

use crate::model::format::{FieldKind, FormatType};
use crate::model::node::{NodeId, NodeSnapshot, NodeSummary};
use crate::repo::format_registry::FormatRegistryError;
use crate::repo::tree_repo::TreeRepoError;
use crate::search::text::{SearchError, SearchMatch};
use crate::service::resolver::ResolveError;
use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-visible error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NodeNotFound,
    AmbiguousReference,
    UnknownFormatType,
    UnknownField,
    FieldTypeMismatch,
    DuplicateFormatType,
    CannotDeleteRoot,
    InvalidMove,
    InvalidParameter,
}

impl ErrorKind {
    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodeNotFound => "NodeNotFound",
            Self::AmbiguousReference => "AmbiguousReference",
            Self::UnknownFormatType => "UnknownFormatType",
            Self::UnknownField => "UnknownField",
            Self::FieldTypeMismatch => "FieldTypeMismatch",
            Self::DuplicateFormatType => "DuplicateFormatType",
            Self::CannotDeleteRoot => "CannotDeleteRoot",
            Self::InvalidMove => "InvalidMove",
            Self::InvalidParameter => "InvalidParameter",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors surfaced in one action's result slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    NodeNotFound(String),
    AmbiguousReference {
        reference: String,
        candidates: Vec<NodeId>,
    },
    UnknownFormatType(String),
    UnknownField {
        format_type: String,
        field: String,
    },
    FieldTypeMismatch {
        field: String,
        kind: FieldKind,
        value: String,
    },
    DuplicateFormatType(String),
    CannotDeleteRoot(NodeId),
    InvalidMove(String),
    InvalidParameter(String),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound(_) => ErrorKind::NodeNotFound,
            Self::AmbiguousReference { .. } => ErrorKind::AmbiguousReference,
            Self::UnknownFormatType(_) => ErrorKind::UnknownFormatType,
            Self::UnknownField { .. } => ErrorKind::UnknownField,
            Self::FieldTypeMismatch { .. } => ErrorKind::FieldTypeMismatch,
            Self::DuplicateFormatType(_) => ErrorKind::DuplicateFormatType,
            Self::CannotDeleteRoot(_) => ErrorKind::CannotDeleteRoot,
            Self::InvalidMove(_) => ErrorKind::InvalidMove,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
        }
    }

    /// Candidate ids for `AmbiguousReference`; empty otherwise.
    pub fn candidates(&self) -> &[NodeId] {
        match self {
            Self::AmbiguousReference { candidates, .. } => candidates,
            _ => &[],
        }
    }

    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

impl Display for ActionError {
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
            Self::UnknownFormatType(name) => write!(f, "unknown format type: {name}"),
            Self::UnknownField { format_type, field } => {
                write!(f, "format type `{format_type}` has no field `{field}`")
            }
            Self::FieldTypeMismatch { field, kind, value } => write!(
                f,
                "value `{value}` for field `{field}` is not a valid {}",
                kind.as_str()
            ),
            Self::DuplicateFormatType(name) => write!(f, "format type already exists: {name}"),
            Self::CannotDeleteRoot(id) => write!(f, "root node cannot be deleted: {id}"),
            Self::InvalidMove(message) => write!(f, "invalid move: {message}"),
            Self::InvalidParameter(message) => write!(f, "invalid parameter: {message}"),
        }
    }
}

impl Error for ActionError {}

impl From<ResolveError> for ActionError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NodeNotFound(reference) => Self::NodeNotFound(reference),
            ResolveError::AmbiguousReference {
                reference,
                candidates,
            } => Self::AmbiguousReference {
                reference,
                candidates,
            },
        }
    }
}

impl From<FormatRegistryError> for ActionError {
    fn from(value: FormatRegistryError) -> Self {
        match value {
            FormatRegistryError::DuplicateFormatType(name) => Self::DuplicateFormatType(name),
            FormatRegistryError::UnknownFormatType(name) => Self::UnknownFormatType(name),
            FormatRegistryError::UnknownField { format_type, field } => {
                Self::UnknownField { format_type, field }
            }
            FormatRegistryError::FieldTypeMismatch { field, kind, value } => {
                Self::FieldTypeMismatch { field, kind, value }
            }
            other @ (FormatRegistryError::InvalidFormatName(_)
            | FormatRegistryError::InvalidFieldSpec(_)
            | FormatRegistryError::DuplicateField(_)
            | FormatRegistryError::UnknownFieldKind { .. }) => {
                Self::InvalidParameter(other.to_string())
            }
        }
    }
}

impl From<TreeRepoError> for ActionError {
    fn from(value: TreeRepoError) -> Self {
        match value {
            TreeRepoError::NodeNotFound(id) => Self::NodeNotFound(id.to_string()),
            TreeRepoError::RootNotRemovable(id) => Self::CannotDeleteRoot(id),
            TreeRepoError::RootNotMovable(_) | TreeRepoError::CycleDetected { .. } => {
                Self::InvalidMove(value.to_string())
            }
        }
    }
}

impl From<SearchError> for ActionError {
    fn from(value: SearchError) -> Self {
        Self::InvalidParameter(value.to_string())
    }
}

/// Node view carrying its index within the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionedNode {
    pub id: NodeId,
    pub title: String,
    pub position: usize,
    /// Present when `include_data` was requested.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<NodeDetails>,
}

/// Content details added by `include_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDetails {
    pub format_type: Option<String>,
    pub data: BTreeMap<String, String>,
    pub child_count: usize,
}

/// One step of a root-to-node path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    pub id: NodeId,
    pub title: String,
    pub parent_id: Option<NodeId>,
    pub position: usize,
}

/// Kind-specific success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionPayload {
    NodeCreated {
        node_id: NodeId,
        parent_id: NodeId,
        position: usize,
    },
    NodeEdited {
        node_id: NodeId,
        node: NodeSnapshot,
        /// Fields dropped because the new format type does not declare them.
        dropped_fields: Vec<String>,
    },
    NodeDeleted {
        node_id: NodeId,
        parent_id: NodeId,
        removed_count: usize,
    },
    NodeMoved {
        node_id: NodeId,
        parent_id: NodeId,
        position: usize,
    },
    Node {
        node: NodeSnapshot,
    },
    NodeFound {
        node: NodeSummary,
    },
    Search {
        count: usize,
        results: Vec<SearchMatch>,
    },
    FormatTypes {
        count: usize,
        formats: Vec<FormatType>,
    },
    FormatTypeCreated {
        format: FormatType,
    },
    TreeStructure {
        tree: NodeSnapshot,
        max_depth: usize,
        node_count: usize,
        format_types: Vec<FormatType>,
    },
    NodePath {
        node: NodeSummary,
        path: Vec<PathEntry>,
    },
    Children {
        parent: NodeSummary,
        children: Vec<PositionedNode>,
        count: usize,
    },
    Siblings {
        parent: Option<NodeSummary>,
        node: PositionedNode,
        siblings: Vec<PositionedNode>,
        count: usize,
    },
}

/// Outcome of one action in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    /// Action name as requested.
    pub action: String,
    pub outcome: Result<ActionPayload, ActionError>,
}

impl ActionResult {
    pub fn success(action: impl Into<String>, payload: ActionPayload) -> Self {
        Self {
            action: action.into(),
            outcome: Ok(payload),
        }
    }

    pub fn failure(action: impl Into<String>, error: ActionError) -> Self {
        Self {
            action: action.into(),
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn payload(&self) -> Option<&ActionPayload> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ActionError> {
        self.outcome.as_ref().err()
    }

    /// Success payload rendered as JSON, used for result bindings.
    pub fn payload_json(&self) -> Option<Value> {
        self.payload()
            .and_then(|payload| serde_json::to_value(payload).ok())
    }
}

impl Serialize for ActionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.outcome {
            Ok(payload) => {
                let fields = match serde_json::to_value(payload).map_err(S::Error::custom)? {
                    Value::Object(fields) => fields,
                    other => {
                        return Err(S::Error::custom(format!(
                            "payload must serialize as an object, got {other}"
                        )))
                    }
                };
                let mut map = serializer.serialize_map(Some(fields.len() + 3))?;
                map.serialize_entry("action", &self.action)?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("status", "success")?;
                for (key, value) in &fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Err(error) => {
                let candidates = error.candidates();
                let len = if candidates.is_empty() { 5 } else { 6 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("action", &self.action)?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("status", "error")?;
                map.serialize_entry("error_kind", &error.kind())?;
                map.serialize_entry("message", &error.to_string())?;
                if !candidates.is_empty() {
                    map.serialize_entry("candidates", candidates)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionError, ActionPayload, ActionResult, ErrorKind};
    use crate::repo::format_registry::FormatRegistryError;
    use crate::repo::tree_repo::TreeRepoError;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn lower_layer_errors_map_to_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(
            ActionError::from(TreeRepoError::RootNotRemovable(id)).kind(),
            ErrorKind::CannotDeleteRoot
        );
        assert_eq!(
            ActionError::from(TreeRepoError::CycleDetected {
                node_id: id,
                parent_id: id
            })
            .kind(),
            ErrorKind::InvalidMove
        );
        assert_eq!(
            ActionError::from(FormatRegistryError::DuplicateField("A".to_string())).kind(),
            ErrorKind::InvalidParameter
        );
    }

    #[test]
    fn failure_slot_carries_kind_message_and_candidates() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let result = ActionResult::failure(
            "get_node",
            ActionError::AmbiguousReference {
                reference: "Notes".to_string(),
                candidates: vec![first, second],
            },
        );
        let rendered = serde_json::to_value(&result).expect("serialize");
        assert_eq!(rendered["ok"], json!(false));
        assert_eq!(rendered["error_kind"], json!("AmbiguousReference"));
        assert_eq!(
            rendered["candidates"],
            json!([first.to_string(), second.to_string()])
        );
        assert!(rendered["message"]
            .as_str()
            .expect("message")
            .contains(&first.to_string()));
    }

    #[test]
    fn success_slot_flattens_payload() {
        let node_id = Uuid::new_v4();
        let parent_id = Uuid::new_v4();
        let result = ActionResult::success(
            "add_node",
            ActionPayload::NodeCreated {
                node_id,
                parent_id,
                position: 2,
            },
        );
        let rendered = serde_json::to_value(&result).expect("serialize");
        assert_eq!(rendered["status"], json!("success"));
        assert_eq!(rendered["node_id"], json!(node_id.to_string()));
        assert_eq!(rendered["position"], json!(2));
        assert!(rendered.get("error_kind").is_none());
    }
}
