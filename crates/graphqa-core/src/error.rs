//! Error types shared across the pipeline.
//!
//! Only adapter-level faults are errors. A model reply without a query and a
//! query the store rejects as invalid Cypher are ordinary outcomes, reported
//! through [`crate::healing::QueryOutput`].

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Stream consumer failed: {0}")]
    Sink(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Database error [{code}]: {message}")]
    Database { code: String, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No LLM provider configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or LOCAL_LLM_URL")]
    NoProviderConfigured,
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Faults that end a text-to-Cypher invocation.
#[derive(Debug, thiserror::Error)]
pub enum Text2CypherError {
    #[error("language model failed: {0}")]
    Llm(#[from] LlmError),
    #[error("graph store failed: {0}")]
    Store(#[from] StoreError),
}
