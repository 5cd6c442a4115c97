//! Neo4j over the HTTP transactional API.
//!
//! Each query is a single auto-commit request to
//! `POST {url}/db/{database}/tx/commit`. Result columns and row arrays are
//! zipped into [`Row`] maps. A `Neo.ClientError.Statement.SyntaxError` is
//! reported as the `invalid_cypher` outcome so the healing cycle can react to
//! it; every other Neo4j error is a [`StoreError::Database`].

use super::{ExecutionResult, GraphStore};
use crate::config::Neo4jConfig;
use crate::error::StoreError;
use crate::schema::{GraphSchema, PropertySchema, Schema};
use crate::Row;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SYNTAX_ERROR_CODE: &str = "Neo.ClientError.Statement.SyntaxError";

const NODE_PROPERTIES_QUERY: &str = "CALL db.schema.nodeTypeProperties() \
     YIELD nodeLabels, propertyName, propertyTypes \
     WHERE propertyName IS NOT NULL \
     RETURN nodeLabels, propertyName, propertyTypes";

const REL_PROPERTIES_QUERY: &str = "CALL db.schema.relTypeProperties() \
     YIELD relType, propertyName, propertyTypes \
     WHERE propertyName IS NOT NULL \
     RETURN relType, propertyName, propertyTypes";

const RELATIONSHIPS_QUERY: &str = "MATCH (a)-[r]->(b) \
     WITH DISTINCT labels(a) AS from, type(r) AS rel, labels(b) AS to \
     RETURN from, rel, to LIMIT 500";

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

pub struct Neo4jStore {
    client: Client,
    config: Neo4jConfig,
}

impl Neo4jStore {
    pub fn new(config: Neo4jConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.url.trim_end_matches('/'),
            self.config.database
        )
    }

    async fn post(&self, cypher: &str) -> Result<TxResponse, StoreError> {
        let body = serde_json::json!({
            "statements": [{ "statement": cypher, "resultDataContents": ["row"] }]
        });

        let response = self
            .client
            .post(self.commit_url())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Connection(format!("{status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    /// Rows of a query that must succeed; used for schema discovery.
    async fn rows(&self, cypher: &str) -> Result<Vec<Row>, StoreError> {
        match classify(self.post(cypher).await?)? {
            ExecutionResult::Rows { rows } => Ok(rows),
            ExecutionResult::QueryError { code, message } => {
                Err(StoreError::Database { code, message })
            }
        }
    }
}

fn classify(response: TxResponse) -> Result<ExecutionResult, StoreError> {
    if let Some(err) = response.errors.into_iter().next() {
        if err.code == SYNTAX_ERROR_CODE {
            return Ok(ExecutionResult::invalid_cypher(err.message));
        }
        return Err(StoreError::Database {
            code: err.code,
            message: err.message,
        });
    }

    let rows = response
        .results
        .into_iter()
        .next()
        .map(|result| {
            result
                .data
                .into_iter()
                .map(|data| result.columns.iter().cloned().zip(data.row).collect::<Row>())
                .collect()
        })
        .unwrap_or_default();

    Ok(ExecutionResult::rows(rows))
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn property(row: &Row) -> Option<PropertySchema> {
    Some(PropertySchema {
        name: row.get("propertyName")?.as_str()?.to_string(),
        types: string_list(row.get("propertyTypes")),
    })
}

/// Strip the leading colon and backticks `db.schema.relTypeProperties()` puts on type names.
fn strip_rel_type(raw: &str) -> &str {
    raw.trim_start_matches(':').trim_matches('`')
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn query(&self, cypher: &str) -> Result<ExecutionResult, StoreError> {
        classify(self.post(cypher).await?)
    }

    async fn schema(&self) -> Result<Schema, StoreError> {
        let mut schema = GraphSchema::default();

        for row in self.rows(NODE_PROPERTIES_QUERY).await? {
            let labels = string_list(row.get("nodeLabels")).join(":");
            if let Some(prop) = property(&row) {
                schema.add_node_property(&labels, prop);
            }
        }

        for row in self.rows(REL_PROPERTIES_QUERY).await? {
            let rel_type = row
                .get("relType")
                .and_then(|v| v.as_str())
                .map(strip_rel_type)
                .unwrap_or_default()
                .to_string();
            if let Some(prop) = property(&row) {
                schema.add_relationship_property(&rel_type, prop);
            }
        }

        for row in self.rows(RELATIONSHIPS_QUERY).await? {
            let from = string_list(row.get("from")).join(":");
            let to = string_list(row.get("to")).join(":");
            if let Some(rel) = row.get("rel").and_then(|v| v.as_str()) {
                schema.add_relationship(&from, rel, &to);
            }
        }

        tracing::debug!(
            labels = schema.node_properties.len(),
            relationships = schema.relationships.len(),
            "discovered Neo4j schema"
        );
        Ok(schema.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> TxResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_columns_zip_into_rows() {
        let response = parse(json!({
            "results": [{
                "columns": ["name", "born"],
                "data": [
                    {"row": ["Keanu", 1964], "meta": [null, null]},
                    {"row": ["Carrie", 1967], "meta": [null, null]}
                ]
            }],
            "errors": []
        }));

        let ExecutionResult::Rows { rows } = classify(response).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Keanu");
        assert_eq!(rows[1]["born"], 1967);
    }

    #[test]
    fn test_syntax_error_maps_to_invalid_cypher() {
        let response = parse(json!({
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Statement.SyntaxError",
                "message": "Invalid input 'RETRN'"
            }]
        }));

        let result = classify(response).unwrap();
        assert!(result.is_syntax_error());
        assert_eq!(result, ExecutionResult::invalid_cypher("Invalid input 'RETRN'"));
    }

    #[test]
    fn test_other_errors_are_store_errors() {
        let response = parse(json!({
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Security.Unauthorized",
                "message": "bad credentials"
            }]
        }));

        let err = classify(response).unwrap_err();
        assert!(matches!(err, StoreError::Database { code, .. } if code.ends_with("Unauthorized")));
    }

    #[test]
    fn test_commit_url() {
        let store = Neo4jStore::new(Neo4jConfig {
            url: "http://localhost:7474/".to_string(),
            ..Neo4jConfig::default()
        })
        .unwrap();
        assert_eq!(store.commit_url(), "http://localhost:7474/db/neo4j/tx/commit");
        assert_eq!(strip_rel_type(":`ACTED_IN`"), "ACTED_IN");
    }
}
