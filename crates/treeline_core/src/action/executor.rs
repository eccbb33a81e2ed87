//! Per-action execution against the tree and the format registry.
//!
//! # Responsibility
//! - Map one action request to its handler and report a typed result.
//! - Resolve references, validate data, then mutate, in that order.
//!
//! # Invariants
//! - Every handler validates before it commits; a failed action leaves the
//!   tree, the registry and the session unchanged.
//! - Failures are returned as values and never abort the caller.
//! - Logs carry ids, action names, counts and error kinds only.
//!
//! # See also
//! - `action::batch` for multi-step execution.

use crate::action::params::{validate_data, Params};
use crate::action::request::{ActionKind, ActionRequest};
use crate::action::result::{
    ActionError, ActionPayload, ActionResult, NodeDetails, PathEntry, PositionedNode,
};
use crate::config::EngineConfig;
use crate::model::node::{Node, NodeData, NodeDraft, NodeId};
use crate::repo::format_registry::FormatRegistry;
use crate::repo::tree_repo::{TreeDocument, TreeRepoError};
use crate::search::text::{search_nodes, SearchQuery};
use crate::service::resolver::NodeResolver;
use crate::service::session::SessionContext;
use log::{debug, info, warn};
use serde_json::Value;

type HandlerResult = Result<ActionPayload, ActionError>;

/// Engine state plus the per-kind handlers.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    tree: TreeDocument,
    formats: FormatRegistry,
    config: EngineConfig,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ActionExecutor {
    /// Creates an engine with a fresh single-root tree and an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tree: TreeDocument::new(config.root_title.trim()),
            formats: FormatRegistry::new(),
            config,
        }
    }

    pub fn tree(&self) -> &TreeDocument {
        &self.tree
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Executes one action request.
    pub fn execute(
        &mut self,
        request: &ActionRequest,
        session: &mut SessionContext,
    ) -> ActionResult {
        self.execute_at(0, request, session)
    }

    /// Executes one action request, tagging log events with its batch index.
    pub(crate) fn execute_at(
        &mut self,
        index: usize,
        request: &ActionRequest,
        session: &mut SessionContext,
    ) -> ActionResult {
        let Some(kind) = ActionKind::parse(&request.action) else {
            warn!(
                "event=action_done module=executor status=error index={} action=unknown error_kind=InvalidParameter",
                index
            );
            return ActionResult::failure(
                request.action.clone(),
                ActionError::invalid_parameter(format!(
                    "unknown action `{}`; expected one of [{}]",
                    request.action.trim(),
                    ActionKind::ALL
                        .iter()
                        .map(|kind| kind.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            );
        };

        debug!(
            "event=action_start module=executor status=ok index={} action={}",
            index,
            kind.as_str()
        );
        let outcome = Params::new(kind, &request.parameters)
            .and_then(|params| self.dispatch(kind, &params, session));

        match &outcome {
            Ok(_) => info!(
                "event=action_done module=executor status=ok index={} action={}",
                index,
                kind.as_str()
            ),
            Err(err) => warn!(
                "event=action_done module=executor status=error index={} action={} error_kind={}",
                index,
                kind.as_str(),
                err.kind()
            ),
        }
        ActionResult {
            action: kind.as_str().to_string(),
            outcome,
        }
    }

    fn dispatch(
        &mut self,
        kind: ActionKind,
        params: &Params<'_>,
        session: &mut SessionContext,
    ) -> HandlerResult {
        match kind {
            ActionKind::AddNode => self.add_node(params, session),
            ActionKind::EditNode => self.edit_node(params, session),
            ActionKind::DeleteNode => self.delete_node(params, session),
            ActionKind::MoveNode => self.move_node(params, session),
            ActionKind::GetNode => self.get_node(params, session),
            ActionKind::SearchNodes => self.search(params),
            ActionKind::GetFormatTypes => Ok(self.format_types()),
            ActionKind::CreateFormatType => self.create_format_type(params),
            ActionKind::GetTreeStructure => self.tree_structure(params),
            ActionKind::GetNodePath => self.node_path(params, session),
            ActionKind::GetNodeChildren => self.node_children(params, session),
            ActionKind::GetNodeSiblings => self.node_siblings(params, session),
            ActionKind::FindNodeByTitle => self.find_node_by_title(params),
        }
    }

    fn resolve_target(
        &self,
        params: &Params<'_>,
        name: &str,
        session: &SessionContext,
    ) -> Result<NodeId, ActionError> {
        let reference = params.optional_reference(name)?;
        let node_id =
            NodeResolver::new(&self.tree).resolve_or_selected(reference.as_deref(), session)?;
        Ok(node_id)
    }

    fn node(&self, node_id: NodeId) -> Result<&Node, ActionError> {
        self.tree
            .get(node_id)
            .ok_or_else(|| ActionError::NodeNotFound(node_id.to_string()))
    }

    /// Returns the canonical registry name for `name`.
    fn format_name(&self, name: &str) -> Result<String, ActionError> {
        Ok(self.formats.require(name)?.name.clone())
    }

    fn add_node(&mut self, params: &Params<'_>, session: &mut SessionContext) -> HandlerResult {
        let title = params.required_title("title")?;
        let position = params.optional_position("position")?;
        let format_type = params
            .optional_reference("format_type")?
            .map(|name| self.format_name(&name))
            .transpose()?;
        let patch = match params.optional_object("data")? {
            Some(data) => validate_data(&self.formats, format_type.as_deref(), data)?,
            None => Default::default(),
        };
        let parent_id = self.resolve_target(params, "parent_id", session)?;

        let data: NodeData = patch
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();
        let draft = NodeDraft {
            title,
            format_type,
            data,
        };
        let (node_id, position) = self.tree.insert_child(parent_id, draft, position)?;
        session.record_created(node_id);

        info!(
            "event=node_created module=executor status=ok node_id={} parent_id={} position={}",
            node_id, parent_id, position
        );
        Ok(ActionPayload::NodeCreated {
            node_id,
            parent_id,
            position,
        })
    }

    fn edit_node(&mut self, params: &Params<'_>, session: &mut SessionContext) -> HandlerResult {
        let new_title = params.optional_title("title")?;
        let new_format = params.optional_reference("format_type")?;
        let data = params.optional_object("data")?;
        if new_title.is_none() && new_format.is_none() && data.is_none() {
            return Err(ActionError::invalid_parameter(
                "edit_node requires at least one of `title`, `data`, `format_type`",
            ));
        }
        let node_id = self.resolve_target(params, "node_id", session)?;
        let node = self.node(node_id)?;

        let current_format = node.format_type().map(str::to_string);
        let target_format = match new_format {
            Some(name) => Some(self.format_name(&name)?),
            None => current_format.clone(),
        };
        let patch = match data {
            Some(data) => validate_data(&self.formats, target_format.as_deref(), data)?,
            None => Default::default(),
        };

        let mut merged = NodeData::new();
        let mut dropped_fields = Vec::new();
        match (&target_format, target_format != current_format) {
            (Some(format_name), true) => {
                let format = self.formats.require(format_name)?;
                for (name, value) in node.data() {
                    let Some(field) = format.field(name) else {
                        dropped_fields.push(name.clone());
                        continue;
                    };
                    if patch.contains_key(name) {
                        continue;
                    }
                    let text = value.to_text();
                    let retyped = field
                        .kind
                        .coerce(&Value::String(text.clone()))
                        .ok_or_else(|| ActionError::FieldTypeMismatch {
                            field: name.clone(),
                            kind: field.kind,
                            value: text,
                        })?;
                    merged.insert(name.clone(), retyped);
                }
            }
            _ => merged.extend(node.data().clone()),
        }
        for (name, value) in patch {
            match value {
                Some(value) => {
                    merged.insert(name, value);
                }
                None => {
                    merged.remove(&name);
                }
            }
        }

        let title = new_title.unwrap_or_else(|| node.title().to_string());
        self.tree
            .replace_content(node_id, title, target_format, merged)?;
        debug!(
            "event=node_edited module=executor status=ok node_id={} dropped_fields={}",
            node_id,
            dropped_fields.len()
        );

        let node = self
            .tree
            .snapshot(node_id, 0)
            .ok_or_else(|| ActionError::NodeNotFound(node_id.to_string()))?;
        Ok(ActionPayload::NodeEdited {
            node_id,
            node,
            dropped_fields,
        })
    }

    fn delete_node(&mut self, params: &Params<'_>, session: &mut SessionContext) -> HandlerResult {
        let node_id = self.resolve_target(params, "node_id", session)?;
        let parent_id = self
            .node(node_id)?
            .parent()
            .ok_or(ActionError::CannotDeleteRoot(node_id))?;

        let removed = self.tree.remove_subtree(node_id)?;
        session.forget_removed(&removed);

        info!(
            "event=node_deleted module=executor status=ok node_id={} removed_count={}",
            node_id,
            removed.len()
        );
        Ok(ActionPayload::NodeDeleted {
            node_id,
            parent_id,
            removed_count: removed.len(),
        })
    }

    fn move_node(&mut self, params: &Params<'_>, session: &mut SessionContext) -> HandlerResult {
        let position = params.optional_position("position")?;
        let target = params.optional_reference("target_parent_id")?;
        let node_id = self.resolve_target(params, "node_id", session)?;
        let current_parent = self
            .node(node_id)?
            .parent()
            .ok_or(TreeRepoError::RootNotMovable(node_id))?;
        let parent_id = match target {
            Some(reference) => NodeResolver::new(&self.tree).resolve(&reference)?,
            None => current_parent,
        };

        let position = self.tree.reparent(node_id, parent_id, position)?;
        info!(
            "event=node_moved module=executor status=ok node_id={} parent_id={} position={}",
            node_id, parent_id, position
        );
        Ok(ActionPayload::NodeMoved {
            node_id,
            parent_id,
            position,
        })
    }

    fn get_node(&self, params: &Params<'_>, session: &SessionContext) -> HandlerResult {
        let include_children = params.optional_bool("include_children", false)?;
        let depth = params.optional_depth(
            "depth",
            self.config.default_node_depth,
            self.config.max_depth,
        )?;
        let node_id = self.resolve_target(params, "node_id", session)?;
        let depth = if include_children { depth } else { 0 };
        let node = self
            .tree
            .snapshot(node_id, depth)
            .ok_or_else(|| ActionError::NodeNotFound(node_id.to_string()))?;
        Ok(ActionPayload::Node { node })
    }

    fn search(&self, params: &Params<'_>) -> HandlerResult {
        let query = SearchQuery {
            text: params.optional_text("search_text")?.unwrap_or_default(),
            title_only: params.optional_bool("title_only", false)?,
            exact_match: params.optional_bool("exact_match", false)?,
            return_nodes: params.optional_bool("return_nodes", false)?,
        };
        let results = search_nodes(&self.tree, &query, self.config.search_result_depth)?;
        debug!(
            "event=search_done module=executor status=ok count={}",
            results.len()
        );
        Ok(ActionPayload::Search {
            count: results.len(),
            results,
        })
    }

    fn format_types(&self) -> ActionPayload {
        let formats: Vec<_> = self.formats.list().into_iter().cloned().collect();
        ActionPayload::FormatTypes {
            count: formats.len(),
            formats,
        }
    }

    fn create_format_type(&mut self, params: &Params<'_>) -> HandlerResult {
        let name = params.required_title("name")?;
        let fields = params.required_value("fields")?;
        let format = self.formats.create_from_spec(&name, fields)?.clone();
        info!(
            "event=format_type_created module=executor status=ok field_count={} registry_size={}",
            format.fields.len(),
            self.formats.len()
        );
        Ok(ActionPayload::FormatTypeCreated { format })
    }

    fn tree_structure(&self, params: &Params<'_>) -> HandlerResult {
        let max_depth = params.optional_depth(
            "max_depth",
            self.config.default_tree_depth,
            self.config.max_depth,
        )?;
        let tree = self
            .tree
            .snapshot(self.tree.root_id(), max_depth)
            .ok_or_else(|| ActionError::NodeNotFound(self.tree.root_id().to_string()))?;
        Ok(ActionPayload::TreeStructure {
            tree,
            max_depth,
            node_count: self.tree.node_count(),
            format_types: self.formats.list().into_iter().cloned().collect(),
        })
    }

    fn node_path(&self, params: &Params<'_>, session: &SessionContext) -> HandlerResult {
        let node_id = self.resolve_target(params, "node_id", session)?;
        let node = self.node(node_id)?.summary();
        let path = self
            .tree
            .ancestors(node_id)
            .into_iter()
            .chain(std::iter::once(node_id))
            .filter_map(|id| self.tree.get(id))
            .map(|step| PathEntry {
                id: step.id(),
                title: step.title().to_string(),
                parent_id: step.parent(),
                position: self.tree.position_of(step.id()).unwrap_or(0),
            })
            .collect();
        Ok(ActionPayload::NodePath { node, path })
    }

    fn node_children(&self, params: &Params<'_>, session: &SessionContext) -> HandlerResult {
        let include_data = params.optional_bool("include_data", false)?;
        let node_id = self.resolve_target(params, "node_id", session)?;
        let parent = self.node(node_id)?;
        let children: Vec<_> = parent
            .children()
            .iter()
            .enumerate()
            .filter_map(|(position, child)| self.positioned(*child, position, include_data))
            .collect();
        Ok(ActionPayload::Children {
            parent: parent.summary(),
            count: children.len(),
            children,
        })
    }

    fn node_siblings(&self, params: &Params<'_>, session: &SessionContext) -> HandlerResult {
        let include_data = params.optional_bool("include_data", false)?;
        let node_id = self.resolve_target(params, "node_id", session)?;
        let node_position = self.tree.position_of(node_id).unwrap_or(0);
        let node = self
            .positioned(node_id, node_position, include_data)
            .ok_or_else(|| ActionError::NodeNotFound(node_id.to_string()))?;

        let parent = self.node(node_id)?.parent().and_then(|id| self.tree.get(id));
        let siblings: Vec<_> = parent
            .map(|parent| {
                parent
                    .children()
                    .iter()
                    .enumerate()
                    .filter(|(_, sibling)| **sibling != node_id)
                    .filter_map(|(position, sibling)| {
                        self.positioned(*sibling, position, include_data)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(ActionPayload::Siblings {
            parent: parent.map(Node::summary),
            node,
            count: siblings.len(),
            siblings,
        })
    }

    fn find_node_by_title(&self, params: &Params<'_>) -> HandlerResult {
        let title = params.required_title("title")?;
        let include_data = params.optional_bool("include_data", false)?;
        let node_id = NodeResolver::new(&self.tree).resolve_title(&title)?;
        if include_data {
            let node = self
                .tree
                .snapshot(node_id, 1)
                .ok_or_else(|| ActionError::NodeNotFound(node_id.to_string()))?;
            return Ok(ActionPayload::Node { node });
        }
        Ok(ActionPayload::NodeFound {
            node: self.node(node_id)?.summary(),
        })
    }

    fn positioned(
        &self,
        node_id: NodeId,
        position: usize,
        include_data: bool,
    ) -> Option<PositionedNode> {
        let node = self.tree.get(node_id)?;
        Some(PositionedNode {
            id: node.id(),
            title: node.title().to_string(),
            position,
            details: include_data.then(|| NodeDetails {
                format_type: node.format_type().map(str::to_string),
                data: node.data_text(),
                child_count: node.children().len(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ActionExecutor;
    use crate::action::request::ActionRequest;
    use crate::action::result::{ActionPayload, ErrorKind};
    use crate::service::session::SessionContext;
    use serde_json::json;

    fn run(
        executor: &mut ActionExecutor,
        session: &mut SessionContext,
        action: &str,
        parameters: serde_json::Value,
    ) -> crate::action::result::ActionResult {
        executor.execute(&ActionRequest::new(action, parameters), session)
    }

    #[test]
    fn unknown_action_is_invalid_parameter() {
        let mut executor = ActionExecutor::default();
        let mut session = SessionContext::new();
        let result = run(&mut executor, &mut session, "rename_node", json!({}));
        assert_eq!(
            result.error().expect("failure").kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(result.action, "rename_node");
    }

    #[test]
    fn add_node_defaults_to_selection_and_records_last_created() {
        let mut executor = ActionExecutor::default();
        let mut session = SessionContext::new();
        let parent = run(&mut executor, &mut session, "add_node", json!({"title": "Inbox"}));
        let Some(ActionPayload::NodeCreated { node_id: inbox, .. }) = parent.payload().cloned()
        else {
            panic!("add_node should succeed: {parent:?}");
        };
        assert_eq!(session.last_created(), Some(inbox));

        session.select(inbox);
        let child = run(&mut executor, &mut session, "add_node", json!({"title": "Call"}));
        match child.payload() {
            Some(ActionPayload::NodeCreated { parent_id, position, .. }) => {
                assert_eq!(*parent_id, inbox);
                assert_eq!(*position, 0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn failed_edit_leaves_node_untouched() {
        let mut executor = ActionExecutor::default();
        let mut session = SessionContext::new();
        run(
            &mut executor,
            &mut session,
            "create_format_type",
            json!({"name": "Task", "fields": {"Done": "Boolean"}}),
        );
        run(
            &mut executor,
            &mut session,
            "add_node",
            json!({"title": "Chore", "data": {"Done": "maybe"}}),
        );

        let result = run(
            &mut executor,
            &mut session,
            "edit_node",
            json!({"node_id": "Chore", "title": "Renamed", "format_type": "Task"}),
        );
        assert_eq!(
            result.error().expect("retyping must fail").kind(),
            ErrorKind::FieldTypeMismatch
        );

        let node = executor
            .tree()
            .traverse()
            .into_iter()
            .find(|node| node.title() == "Chore")
            .expect("title unchanged");
        assert_eq!(node.format_type(), None);
    }

    #[test]
    fn edit_with_no_changes_is_rejected() {
        let mut executor = ActionExecutor::default();
        let mut session = SessionContext::new();
        let result = run(&mut executor, &mut session, "edit_node", json!({"node_id": "Root"}));
        assert_eq!(
            result.error().expect("failure").kind(),
            ErrorKind::InvalidParameter
        );
    }
}
