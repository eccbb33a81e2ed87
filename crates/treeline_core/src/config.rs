//! Engine configuration.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `validate` runs before a config reaches the executor.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_ROOT_TITLE: &str = "Root";
const DEFAULT_TREE_DEPTH: usize = 3;
const DEFAULT_NODE_DEPTH: usize = 1;
const DEFAULT_MAX_DEPTH: usize = 32;
const DEFAULT_SEARCH_RESULT_DEPTH: usize = 1;

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Title of the root node of a fresh tree.
    pub root_title: String,
    /// `get_tree_structure` depth when `max_depth` is omitted.
    pub default_tree_depth: usize,
    /// `get_node` depth when children are requested without `depth`.
    pub default_node_depth: usize,
    /// Upper bound for every depth parameter.
    pub max_depth: usize,
    /// Child depth of full node payloads returned by search.
    pub search_result_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_title: DEFAULT_ROOT_TITLE.to_string(),
            default_tree_depth: DEFAULT_TREE_DEPTH,
            default_node_depth: DEFAULT_NODE_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            search_result_depth: DEFAULT_SEARCH_RESULT_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_title.trim().is_empty() {
            return Err(ConfigError::EmptyRootTitle);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        for (name, value) in [
            ("default_tree_depth", self.default_tree_depth),
            ("default_node_depth", self.default_node_depth),
            ("search_result_depth", self.search_result_depth),
        ] {
            if value > self.max_depth {
                return Err(ConfigError::DepthAboveMax {
                    name,
                    value,
                    max_depth: self.max_depth,
                });
            }
        }
        Ok(())
    }
}

/// Config parse and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    EmptyRootTitle,
    ZeroMaxDepth,
    DepthAboveMax {
        name: &'static str,
        value: usize,
        max_depth: usize,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid engine config: {message}"),
            Self::EmptyRootTitle => write!(f, "root_title cannot be empty"),
            Self::ZeroMaxDepth => write!(f, "max_depth must be at least 1"),
            Self::DepthAboveMax {
                name,
                value,
                max_depth,
            } => write!(f, "{name} ({value}) exceeds max_depth ({max_depth})"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("defaults");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_tree_depth, 3);
        assert_eq!(config.root_title, "Root");
    }

    #[test]
    fn partial_document_overrides_named_fields() {
        let config =
            EngineConfig::from_json_str(r#"{"root_title": "Notebook", "max_depth": 8}"#)
                .expect("partial config");
        assert_eq!(config.root_title, "Notebook");
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.default_node_depth, 1);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            EngineConfig::from_json_str(r#"{"root_title": "  "}"#),
            Err(ConfigError::EmptyRootTitle)
        );
        assert_eq!(
            EngineConfig::from_json_str(r#"{"max_depth": 0}"#),
            Err(ConfigError::ZeroMaxDepth)
        );
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"max_depth": 2}"#),
            Err(ConfigError::DepthAboveMax {
                name: "default_tree_depth",
                ..
            })
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"colour": "blue"}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
