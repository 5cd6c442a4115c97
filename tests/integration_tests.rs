//! Integration tests for the complete GraphQA pipeline
//!
//! These tests verify end-to-end functionality through the public API:
//! - Config file → Text2Cypher → Store
//! - Examples file → Prompt
//! - Question → Cypher → Rows → Summary
//!
//! Run with: cargo test --test integration_tests

use graphqa_core::llm::mock::ScriptedModel;
use graphqa_core::schema::PropertySchema;
use graphqa_core::store::mock::ScriptedStore;
use graphqa_core::*;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::tempdir;

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn movie_schema() -> Schema {
    let mut schema = GraphSchema::default();
    schema.add_node_property(
        "Person",
        PropertySchema {
            name: "name".to_string(),
            types: vec!["String".to_string()],
        },
    );
    schema.add_node_property(
        "Movie",
        PropertySchema {
            name: "title".to_string(),
            types: vec!["String".to_string()],
        },
    );
    schema.add_relationship("Person", "ACTED_IN", "Movie");
    schema.render()
}

// ============================================================================
// Configuration Files
// ============================================================================

#[tokio::test]
async fn test_config_and_examples_files_shape_the_prompt() {
    let dir = tempdir().unwrap();

    let config_path = dir.path().join("graphqa.json");
    let mut config_file = std::fs::File::create(&config_path).unwrap();
    write!(config_file, r#"{{"ignore_relationship_direction": false}}"#).unwrap();

    let examples_path = dir.path().join("examples.txt");
    std::fs::write(
        &examples_path,
        "#Who acted in The Matrix?\nMATCH (p:Person)-[:ACTED_IN]->(:Movie {title: 'The Matrix'}) RETURN p.name\n",
    )
    .unwrap();

    let config = Text2CypherConfig::load(&config_path).unwrap();
    let examples = ExampleSet::load(&examples_path).unwrap();
    assert_eq!(examples.len(), 1);

    let model = Arc::new(ScriptedModel::always(
        "```MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETURN m.title```",
    ));
    let store = Arc::new(
        ScriptedStore::always(ExecutionResult::rows(vec![row(json!({"m.title": "Speed"}))]))
            .with_schema(movie_schema()),
    );

    let t2c = Text2Cypher::from_config(model.clone(), store.clone(), &config, examples)
        .await
        .unwrap();
    let output = t2c.run("What did Keanu act in?", &[], config.heal_cypher).await.unwrap();

    // Direction kept because the config file turned normalization off.
    assert_eq!(
        store.queries(),
        vec!["MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETURN m.title"]
    );
    assert_eq!(output.output.to_rows(), vec![row(json!({"m.title": "Speed"}))]);

    let system = &model.prompts()[0][0].content;
    assert!(system.contains("(:Person)-[:ACTED_IN]->(:Movie)"));
    assert!(system.contains("#Who acted in The Matrix?"));
}

// ============================================================================
// Full Assistant
// ============================================================================

#[tokio::test]
async fn test_question_to_summary_with_healing() {
    let model = Arc::new(ScriptedModel::new([
        "```MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETRN count(m)```",
        "Sorry about that:\n```MATCH (p:Person)-[:ACTED_IN]->(m:Movie) RETURN count(m) AS movies```",
        "Keanu acted in 7 movies.",
    ]));
    let store = Arc::new(ScriptedStore::new([
        ExecutionResult::invalid_cypher("Invalid input 'RETRN'"),
        ExecutionResult::rows(vec![row(json!({"movies": 7}))]),
    ]));

    let assistant = GraphQaAssistant::new(
        Text2Cypher::new(model.clone(), store.clone()).with_schema(Some(movie_schema())),
        Summarizer::new(model.clone(), true),
    );

    let answer = assistant
        .ask("How many movies did Keanu act in?", &[], true)
        .await
        .unwrap();

    assert!(answer.healed);
    assert_eq!(
        answer.generated_cypher.as_deref(),
        Some("MATCH (p:Person)-[:ACTED_IN]-(m:Movie) RETURN count(m) AS movies")
    );
    assert_eq!(answer.rows, vec![row(json!({"movies": 7}))]);
    assert_eq!(answer.answer, "Keanu acted in 7 movies.");
    assert_eq!(model.calls(), 3);

    let serialized = serde_json::to_value(&answer).unwrap();
    assert_eq!(serialized["answer"], "Keanu acted in 7 movies.");
}

#[tokio::test]
async fn test_shared_pipeline_serves_concurrent_questions() {
    let model = Arc::new(ScriptedModel::always("```MATCH (n) RETURN count(n) AS c```"));
    let store = Arc::new(ScriptedStore::always(ExecutionResult::rows(vec![row(
        json!({"c": 1}),
    )])));
    let t2c = Arc::new(Text2Cypher::new(model.clone(), store));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let t2c = Arc::clone(&t2c);
            tokio::spawn(async move { t2c.run(&format!("question {i}"), &[], true).await })
        })
        .collect();

    for handle in handles {
        let output = handle.await.unwrap().unwrap();
        assert_eq!(output.generations, 1);
    }
    assert_eq!(model.calls(), 8);
}
