//! GraphQA Core: Natural Language → Cypher with Single-Shot Self-Healing
//!
//! This crate turns a user question into a Cypher query with a language model,
//! runs it against a graph store, and repairs a syntactically broken query at
//! most once by feeding the store's error back to the model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                        TEXT → CYPHER PIPELINE                            │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────┐    ┌─────────────┐    ┌───────────┐    ┌──────────────┐    │
//! │  │ Question │───►│   Prompt    │───►│    LLM    │───►│  Extractor   │    │
//! │  └──────────┘    │  (schema +  │    │ (OpenAI,  │    │ (```...```)  │    │
//! │                  │  examples)  │    │ Anthropic,│    └──────┬───────┘    │
//! │                  └──────▲──────┘    │  Local)   │           │            │
//! │                         │           └───────────┘    no payload?        │
//! │                         │                            ──► clarification  │
//! │                   heal once with                            │            │
//! │                   store's error                     ┌──────▼───────┐    │
//! │                         │                           │  Direction   │    │
//! │                         │                           │  Normalizer  │    │
//! │                         │                           └──────┬───────┘    │
//! │                  ┌──────┴──────┐                    ┌──────▼───────┐    │
//! │                  │  Healing    │◄── invalid_cypher ─│ Graph Store  │    │
//! │                  │ Controller  │                    │  (Neo4j)     │    │
//! │                  └─────────────┘                    └──────┬───────┘    │
//! │                                                            │ rows        │
//! │                                                     ┌──────▼───────┐    │
//! │                                                     │  Summarizer  │    │
//! │                                                     └──────────────┘    │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contracts
//! - Queries travel from the model to the extractor wrapped in triple backticks
//!   ([`prompt::QUERY_DELIMITER`]); both sides share that constant.
//! - The store reports a syntax problem as [`store::ExecutionResult::QueryError`]
//!   with code [`store::INVALID_CYPHER`]; every other store failure is an error.
//! - Model and store failures propagate unchanged and never trigger healing.

pub mod assistant;
pub mod config;
pub mod error;
pub mod examples;
pub mod extract;
pub mod healing;
pub mod llm;
pub mod normalize;
pub mod prompt;
pub mod schema;
pub mod store;
pub mod summarize;

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// A single result row: column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered turns handed to the model.
pub type MessageHistory = Vec<Message>;

// ============================================================================
// Re-exports
// ============================================================================

pub use assistant::{AssistantAnswer, GraphQaAssistant};
pub use config::Text2CypherConfig;
pub use error::{ConfigError, LlmError, StoreError, Text2CypherError};
pub use examples::ExampleSet;
pub use extract::extract_query;
pub use healing::{QueryOutput, Text2Cypher, Text2CypherOutput};
pub use llm::{LanguageModel, QueryGenerator, TokenSink};
pub use normalize::remove_relationship_direction;
pub use prompt::PromptBuilder;
pub use schema::{GraphSchema, Schema};
pub use store::{ExecutionResult, GraphStore, INVALID_CYPHER};
pub use summarize::{remove_large_values, Summarizer};
