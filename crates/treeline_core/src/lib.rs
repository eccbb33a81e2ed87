//! Action execution engine for TreeLine documents.
//! This crate is the single source of truth for tree and schema invariants.

pub mod action;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use action::batch::{BatchCoordinator, BatchReport};
pub use action::executor::ActionExecutor;
pub use action::request::{ActionKind, ActionRequest, AgentResponse};
pub use action::result::{ActionError, ActionPayload, ActionResult, ErrorKind};
pub use config::{ConfigError, EngineConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::format::{FieldDef, FieldKind, FieldValue, FormatType};
pub use model::node::{Node, NodeDraft, NodeId, NodeSnapshot, NodeSummary};
pub use repo::format_registry::{FormatRegistry, FormatRegistryError};
pub use repo::tree_repo::{TreeDocument, TreeRepoError};
pub use search::text::{search_nodes, SearchError, SearchHit, SearchMatch, SearchQuery};
pub use service::resolver::{NodeResolver, ResolveError};
pub use service::session::SessionContext;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
