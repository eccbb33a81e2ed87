//! Ordered multi-step execution with late-bound parameters.
//!
//! # Responsibility
//! - Run a batch of action requests strictly in order.
//! - Substitute result bindings (`$0.node_id`, `$last.results.0.id`)
//!   immediately before each action runs.
//! - Aggregate per-action results into one report.
//!
//! # Invariants
//! - A failed action never stops, reorders or rolls back its siblings.
//! - References are resolved against the tree as left by every prior action.
//! - A binding may only point at an earlier, successful action.

use crate::action::executor::ActionExecutor;
use crate::action::request::{ActionRequest, AgentResponse};
use crate::action::result::{ActionError, ActionResult};
use crate::model::node::NodeId;
use crate::service::session::SessionContext;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static BINDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$(last|\d+)\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)$")
        .expect("binding regex must compile")
});

const ESCAPED_DOLLAR: &str = "$$";

/// Ordered results of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Agent prose that accompanied the actions, if any.
    pub response: Option<String>,
    pub results: Vec<ActionResult>,
    pub any_failure: bool,
    /// Most recent node created by this session, carried into the next turn.
    pub last_created_node: Option<NodeId>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.is_success())
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Runs batches against one executor and session.
pub struct BatchCoordinator<'a> {
    executor: &'a mut ActionExecutor,
    session: &'a mut SessionContext,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(executor: &'a mut ActionExecutor, session: &'a mut SessionContext) -> Self {
        Self { executor, session }
    }

    /// Runs every action of a parsed agent response.
    pub fn run_response(&mut self, response: &AgentResponse) -> BatchReport {
        let mut report = self.run(&response.actions);
        report.response = response.response.clone();
        report
    }

    /// Runs `requests` in order and reports each outcome.
    pub fn run(&mut self, requests: &[ActionRequest]) -> BatchReport {
        info!(
            "event=batch_start module=batch status=ok action_count={}",
            requests.len()
        );

        let mut results: Vec<ActionResult> = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let result = match bind_parameters(&request.parameters, index, &results) {
                Ok(parameters) => {
                    let bound = ActionRequest::new(request.action.clone(), parameters);
                    self.executor.execute_at(index, &bound, self.session)
                }
                Err(err) => {
                    warn!(
                        "event=action_done module=batch status=error index={} error_kind={}",
                        index,
                        err.kind()
                    );
                    ActionResult::failure(request.action.trim(), err)
                }
            };
            results.push(result);
        }

        let report = BatchReport {
            response: None,
            any_failure: results.iter().any(|result| !result.is_success()),
            results,
            last_created_node: self.session.last_created(),
        };
        info!(
            "event=batch_done module=batch status={} success_count={} failure_count={}",
            if report.any_failure { "error" } else { "ok" },
            report.success_count(),
            report.failure_count()
        );
        report
    }
}

/// Returns `parameters` with every binding string substituted.
fn bind_parameters(
    parameters: &Value,
    index: usize,
    previous: &[ActionResult],
) -> Result<Value, ActionError> {
    match parameters {
        Value::String(text) => bind_string(text, index, previous),
        Value::Array(items) => items
            .iter()
            .map(|item| bind_parameters(item, index, previous))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| Ok((key.clone(), bind_parameters(value, index, previous)?)))
            .collect::<Result<serde_json::Map<_, _>, ActionError>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn bind_string(text: &str, index: usize, previous: &[ActionResult]) -> Result<Value, ActionError> {
    if let Some(rest) = text.strip_prefix(ESCAPED_DOLLAR) {
        return Ok(Value::String(format!("${rest}")));
    }
    let Some(captures) = BINDING_RE.captures(text.trim()) else {
        return Ok(Value::String(text.to_string()));
    };

    let source = match &captures[1] {
        "last" => index.checked_sub(1),
        digits => digits.parse::<usize>().ok().filter(|source| *source < index),
    }
    .ok_or_else(|| {
        ActionError::invalid_parameter(format!(
            "binding `{text}` must refer to an earlier action in the batch"
        ))
    })?;

    let payload = previous
        .get(source)
        .and_then(ActionResult::payload_json)
        .ok_or_else(|| {
            ActionError::invalid_parameter(format!(
                "binding `{text}` refers to action {source}, which did not succeed"
            ))
        })?;

    lookup_path(&payload, &captures[2])
        .filter(|value| !value.is_null())
        .cloned()
        .ok_or_else(|| {
            ActionError::invalid_parameter(format!(
                "binding `{text}` has no value in the result of action {source}"
            ))
        })
}

fn lookup_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|position| items.get(position)),
        _ => None,
    })
}
