//! Configuration for the pipeline and the Neo4j adapter.
//!
//! Values come from a JSON file or the defaults, then `GRAPHQA_*` environment
//! variables override individual flags.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Behavior switches for [`crate::healing::Text2Cypher`] and the summarizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Text2CypherConfig {
    /// Inject the store schema into the system prompt
    pub use_schema: bool,
    /// Collapse `->`/`<-` before execution
    pub ignore_relationship_direction: bool,
    /// Allow the single healing cycle on `invalid_cypher`
    pub heal_cypher: bool,
    /// Strip embedding-sized values from rows before summarization
    pub exclude_embeddings: bool,
}

impl Default for Text2CypherConfig {
    fn default() -> Self {
        Self {
            use_schema: true,
            ignore_relationship_direction: true,
            heal_cypher: true,
            exclude_embeddings: true,
        }
    }
}

impl Text2CypherConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))
    }

    /// Apply `GRAPHQA_USE_SCHEMA`, `GRAPHQA_IGNORE_DIRECTION`, `GRAPHQA_HEAL_CYPHER`
    /// and `GRAPHQA_EXCLUDE_EMBEDDINGS` when set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let flag = |name: &str, current: bool| -> Result<bool, ConfigError> {
            match lookup(name) {
                None => Ok(current),
                Some(raw) => parse_bool(&raw)
                    .ok_or_else(|| ConfigError::Invalid(format!("{name}={raw} is not a boolean"))),
            }
        };

        self.use_schema = flag("GRAPHQA_USE_SCHEMA", self.use_schema)?;
        self.ignore_relationship_direction =
            flag("GRAPHQA_IGNORE_DIRECTION", self.ignore_relationship_direction)?;
        self.heal_cypher = flag("GRAPHQA_HEAL_CYPHER", self.heal_cypher)?;
        self.exclude_embeddings = flag("GRAPHQA_EXCLUDE_EMBEDDINGS", self.exclude_embeddings)?;
        Ok(self)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Connection settings for [`crate::store::neo4j::Neo4jStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// HTTP endpoint, e.g. `http://localhost:7474`
    pub url: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub database: String,
    pub timeout_secs: u64,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Neo4jConfig {
    /// `NEO4J_URL` and `NEO4J_PASS` are required; `NEO4J_USER` and
    /// `NEO4J_DATABASE` default to `neo4j`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            url: lookup("NEO4J_URL").ok_or(ConfigError::MissingVar("NEO4J_URL"))?,
            user: lookup("NEO4J_USER").unwrap_or(defaults.user),
            password: lookup("NEO4J_PASS").ok_or(ConfigError::MissingVar("NEO4J_PASS"))?,
            database: lookup("NEO4J_DATABASE").unwrap_or(defaults.database),
            timeout_secs: defaults.timeout_secs,
        })
    }
}
