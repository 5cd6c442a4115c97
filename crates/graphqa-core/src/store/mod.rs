//! Graph store boundary.

pub mod mock;
#[cfg(feature = "neo4j")]
pub mod neo4j;

use crate::error::StoreError;
use crate::schema::Schema;
use crate::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error code a store uses for a query it could not compile.
pub const INVALID_CYPHER: &str = "invalid_cypher";

/// Outcome of running a query the store accepted for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResult {
    Rows { rows: Vec<Row> },
    QueryError { code: String, message: String },
}

impl ExecutionResult {
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::Rows { rows }
    }

    pub fn invalid_cypher(message: impl Into<String>) -> Self {
        Self::QueryError {
            code: INVALID_CYPHER.to_string(),
            message: message.into(),
        }
    }

    /// Classify a shape-tagged result: a first row whose `code` is
    /// `invalid_cypher` is the syntax-error sentinel, anything else is data.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let sentinel = rows.first().and_then(|row| {
            let code = row.get("code")?.as_str()?;
            (code == INVALID_CYPHER).then(|| {
                let message = match row.get("message") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                (code.to_string(), message)
            })
        });

        match sentinel {
            Some((code, message)) => Self::QueryError { code, message },
            None => Self::Rows { rows },
        }
    }

    /// True for the only error that triggers a healing cycle.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::QueryError { code, .. } if code == INVALID_CYPHER)
    }
}

/// Trait for graph databases that run Cypher
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run `cypher`. Syntax problems come back as
    /// [`ExecutionResult::QueryError`]; any other failure is an `Err`.
    async fn query(&self, cypher: &str) -> Result<ExecutionResult, StoreError>;

    /// Describe labels, relationship types and properties for prompting.
    async fn schema(&self) -> Result<Schema, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_sentinel_row_becomes_query_error() {
        let result = ExecutionResult::from_rows(vec![row(
            json!({"code": "invalid_cypher", "message": "Invalid input 'RETRN'"}),
        )]);
        assert_eq!(result, ExecutionResult::invalid_cypher("Invalid input 'RETRN'"));
        assert!(result.is_syntax_error());
    }

    #[test]
    fn test_other_codes_are_data() {
        let rows = vec![row(json!({"code": "US", "message": "hello"}))];
        let result = ExecutionResult::from_rows(rows.clone());
        assert_eq!(result, ExecutionResult::rows(rows));
        assert!(!result.is_syntax_error());
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(ExecutionResult::from_rows(vec![]), ExecutionResult::rows(vec![]));
    }
}
