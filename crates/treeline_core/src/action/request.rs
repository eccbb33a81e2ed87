//! Action request wire shapes.
//!
//! # Responsibility
//! - Define the closed set of action kinds and their parameter contracts.
//! - Parse agent response envelopes into ordered action requests.
//!
//! # Invariants
//! - Parsing never fails: malformed items become requests that fail with
//!   `InvalidParameter` when executed, so sibling actions still run.
//! - Action names are resolved late, at execution time.

use serde::Serialize;
use serde_json::{Map, Value};

/// Closed set of supported actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddNode,
    EditNode,
    DeleteNode,
    MoveNode,
    GetNode,
    SearchNodes,
    GetFormatTypes,
    CreateFormatType,
    GetTreeStructure,
    GetNodePath,
    GetNodeChildren,
    GetNodeSiblings,
    FindNodeByTitle,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::AddNode,
        ActionKind::EditNode,
        ActionKind::DeleteNode,
        ActionKind::MoveNode,
        ActionKind::GetNode,
        ActionKind::SearchNodes,
        ActionKind::GetFormatTypes,
        ActionKind::CreateFormatType,
        ActionKind::GetTreeStructure,
        ActionKind::GetNodePath,
        ActionKind::GetNodeChildren,
        ActionKind::GetNodeSiblings,
        ActionKind::FindNodeByTitle,
    ];

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddNode => "add_node",
            Self::EditNode => "edit_node",
            Self::DeleteNode => "delete_node",
            Self::MoveNode => "move_node",
            Self::GetNode => "get_node",
            Self::SearchNodes => "search_nodes",
            Self::GetFormatTypes => "get_format_types",
            Self::CreateFormatType => "create_format_type",
            Self::GetTreeStructure => "get_tree_structure",
            Self::GetNodePath => "get_node_path",
            Self::GetNodeChildren => "get_node_children",
            Self::GetNodeSiblings => "get_node_siblings",
            Self::FindNodeByTitle => "find_node_by_title",
        }
    }

    /// Parses a wire name. Surrounding whitespace and case are ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Parameter names accepted by this action.
    pub fn parameter_names(self) -> &'static [&'static str] {
        match self {
            Self::AddNode => &["parent_id", "title", "data", "format_type", "position"],
            Self::EditNode => &["node_id", "title", "data", "format_type"],
            Self::DeleteNode => &["node_id"],
            Self::MoveNode => &["node_id", "target_parent_id", "position"],
            Self::GetNode => &["node_id", "include_children", "depth"],
            Self::SearchNodes => &["search_text", "title_only", "exact_match", "return_nodes"],
            Self::GetFormatTypes => &[],
            Self::CreateFormatType => &["name", "fields"],
            Self::GetTreeStructure => &["max_depth"],
            Self::GetNodePath => &["node_id"],
            Self::GetNodeChildren => &["node_id", "include_data"],
            Self::GetNodeSiblings => &["node_id", "include_data"],
            Self::FindNodeByTitle => &["title", "include_data"],
        }
    }
}

/// One action request as received from the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Raw action name; resolved to `ActionKind` at execution time.
    pub action: String,
    /// Raw parameters; expected to be an object or null.
    pub parameters: Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, parameters: Value) -> Self {
        Self {
            action: action.into(),
            parameters,
        }
    }

    /// Builds a request from one `{"action", "parameters"}` object.
    ///
    /// Non-object items keep the whole item as parameters and an empty
    /// action name, which fails at execution time.
    pub fn from_value(item: &Value) -> Self {
        match item {
            Value::Object(map) => Self::from_object(map),
            other => Self::new(String::new(), other.clone()),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Self {
        let action = match map.get("action") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let parameters = map.get("parameters").cloned().unwrap_or(Value::Null);
        Self { action, parameters }
    }
}

/// Parsed agent response: optional prose plus ordered actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentResponse {
    pub response: Option<String>,
    pub actions: Vec<ActionRequest>,
}

impl AgentResponse {
    /// Parses agent output text.
    ///
    /// Accepts bare JSON or JSON inside a fenced code block. Text that is not
    /// JSON is kept as the response with no actions.
    pub fn from_json_str(text: &str) -> Self {
        let candidate = extract_json_block(text);
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self {
                response: Some(text.trim().to_string()),
                actions: Vec::new(),
            },
        }
    }

    /// Builds a response from a parsed JSON document.
    ///
    /// Multi-step (`actions`) takes precedence over single-step
    /// (`action` + `parameters`). A bare array is read as a list of actions.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                let response = map
                    .get("response")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let actions = match (map.get("actions"), map.get("action")) {
                    (Some(Value::Array(items)), _) => {
                        items.iter().map(ActionRequest::from_value).collect()
                    }
                    (Some(Value::Null) | None, Some(_)) => vec![ActionRequest::from_object(map)],
                    (Some(Value::Null) | None, None) => Vec::new(),
                    (Some(other), _) => vec![ActionRequest::from_value(other)],
                };
                Self { response, actions }
            }
            Value::Array(items) => Self {
                response: None,
                actions: items.iter().map(ActionRequest::from_value).collect(),
            },
            Value::String(text) => Self {
                response: Some(text.clone()),
                actions: Vec::new(),
            },
            _ => Self::default(),
        }
    }
}

fn extract_json_block(text: &str) -> &str {
    for fence in ["```json", "```"] {
        if let Some(start) = text.find(fence) {
            let body = &text[start + fence.len()..];
            if let Some(end) = body.find("```") {
                return body[..end].trim();
            }
        }
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::{ActionKind, ActionRequest, AgentResponse};
    use serde_json::json;

    #[test]
    fn every_kind_round_trips_its_wire_name() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActionKind::parse(" Add_Node "), Some(ActionKind::AddNode));
        assert_eq!(ActionKind::parse("rename_node"), None);
    }

    #[test]
    fn parses_multi_step_envelope() {
        let response = AgentResponse::from_value(&json!({
            "response": "Adding two nodes",
            "actions": [
                {"action": "add_node", "parameters": {"title": "A"}},
                {"action": "add_node", "parameters": {"title": "B"}}
            ]
        }));
        assert_eq!(response.response.as_deref(), Some("Adding two nodes"));
        assert_eq!(response.actions.len(), 2);
        assert_eq!(response.actions[1].parameters, json!({"title": "B"}));
    }

    #[test]
    fn parses_single_step_envelope() {
        let response = AgentResponse::from_value(&json!({
            "response": "Looking it up",
            "action": "get_node",
            "parameters": {"node_id": "Finance"}
        }));
        assert_eq!(
            response.actions,
            vec![ActionRequest::new("get_node", json!({"node_id": "Finance"}))]
        );
    }

    #[test]
    fn extracts_fenced_json_and_keeps_plain_text() {
        let text = "Sure!\n```json\n{\"action\": \"get_format_types\", \"parameters\": {}}\n```";
        let response = AgentResponse::from_json_str(text);
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.actions[0].action, "get_format_types");

        let plain = AgentResponse::from_json_str("I need more details first.");
        assert!(plain.actions.is_empty());
        assert_eq!(
            plain.response.as_deref(),
            Some("I need more details first.")
        );
    }

    #[test]
    fn malformed_items_are_kept_for_per_action_failure() {
        let response = AgentResponse::from_value(&json!({"actions": [42, {"parameters": {}}]}));
        assert_eq!(response.actions.len(), 2);
        assert!(response.actions[0].action.is_empty());
        assert!(response.actions[1].action.is_empty());
    }
}
