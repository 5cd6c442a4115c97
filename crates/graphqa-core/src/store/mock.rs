//! Scripted graph store for tests and offline demos.

use super::{ExecutionResult, GraphStore};
use crate::error::StoreError;
use crate::schema::Schema;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returns queued results in order, then `fallback` forever. Every query it
/// receives is recorded.
pub struct ScriptedStore {
    results: Mutex<VecDeque<Result<ExecutionResult, String>>>,
    fallback: Result<ExecutionResult, String>,
    queries: Mutex<Vec<String>>,
    schema: Schema,
}

impl ScriptedStore {
    pub fn new(results: impl IntoIterator<Item = ExecutionResult>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().map(Ok).collect()),
            fallback: Ok(ExecutionResult::rows(Vec::new())),
            queries: Mutex::new(Vec::new()),
            schema: Schema::default(),
        }
    }

    /// Every query gets `result`.
    pub fn always(result: ExecutionResult) -> Self {
        Self::new([]).with_fallback(result)
    }

    /// Every query fails with `StoreError::Connection(message)`.
    pub fn unreachable(message: &str) -> Self {
        let mut store = Self::new([]);
        store.fallback = Err(message.to_string());
        store
    }

    pub fn with_fallback(mut self, result: ExecutionResult) -> Self {
        self.fallback = Ok(result);
        self
    }

    pub fn with_schema(mut self, schema: impl Into<Schema>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    async fn query(&self, cypher: &str) -> Result<ExecutionResult, StoreError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(cypher.to_string());
        }

        let next = self
            .results
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(StoreError::Connection)
    }

    async fn schema(&self) -> Result<Schema, StoreError> {
        Ok(self.schema.clone())
    }
}
