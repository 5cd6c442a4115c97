//! Text → Cypher with a single self-healing retry.
//!
//! One invocation walks a small state machine:
//!
//! ```text
//! Generating ──► Extracted ──► Executed ──► Done
//!     │   ▲                       │
//!     │   └────── Healing ◄───────┘  (invalid_cypher, healing still enabled)
//!     │
//!     └──► Done  (no delimited query: clarification)
//! ```
//!
//! `healing_enabled` is cleared on the way through `Healing`, so the loop can
//! take that edge at most once per call. Model and store failures leave the
//! machine immediately as errors.

use crate::config::Text2CypherConfig;
use crate::error::{StoreError, Text2CypherError};
use crate::examples::ExampleSet;
use crate::extract::extract_query;
use crate::llm::{LanguageModel, QueryGenerator, TokenSink};
use crate::normalize::remove_relationship_direction;
use crate::prompt::{PromptBuilder, QUESTION_PREFIX};
use crate::schema::Schema;
use crate::store::{ExecutionResult, GraphStore};
use crate::{Message, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// Output
// ============================================================================

/// What the caller gets back from a completed invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryOutput {
    /// The query ran; rows in store order
    Rows { rows: Vec<Row> },
    /// The store rejected the final query; reported verbatim
    QueryError { code: String, message: String },
    /// The model asked for more information instead of producing a query
    Clarification { message: String },
}

impl QueryOutput {
    /// Row-shaped view: data rows, a `{code, message}` row, or a `{message}` row.
    pub fn to_rows(&self) -> Vec<Row> {
        match self {
            QueryOutput::Rows { rows } => rows.clone(),
            QueryOutput::QueryError { code, message } => {
                let mut row = Row::new();
                row.insert("code".to_string(), code.clone().into());
                row.insert("message".to_string(), message.clone().into());
                vec![row]
            }
            QueryOutput::Clarification { message } => {
                let mut row = Row::new();
                row.insert("message".to_string(), message.clone().into());
                vec![row]
            }
        }
    }
}

impl From<ExecutionResult> for QueryOutput {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Rows { rows } => QueryOutput::Rows { rows },
            ExecutionResult::QueryError { code, message } => QueryOutput::QueryError { code, message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text2CypherOutput {
    /// The query that was executed last; `None` for a clarification
    pub generated_cypher: Option<String>,
    pub output: QueryOutput,
    /// Model calls made: 1, or 2 when a healing cycle ran
    pub generations: usize,
}

impl Text2CypherOutput {
    pub fn healed(&self) -> bool {
        self.generations > 1
    }

    /// `{"generated_cypher": ..., "output": [rows...]}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "generated_cypher": self.generated_cypher,
            "output": self.output.to_rows(),
        })
    }
}

// ============================================================================
// State machine
// ============================================================================

struct Attempt {
    /// Question as the caller (or the healing step) phrased it, unprefixed
    question: String,
    history: Vec<Message>,
    healing_enabled: bool,
}

enum State {
    Generating(Attempt),
    Extracted {
        attempt: Attempt,
        raw: String,
        cypher: String,
    },
    Executed {
        attempt: Attempt,
        raw: String,
        cypher: String,
        result: ExecutionResult,
    },
    Healing {
        attempt: Attempt,
        raw: String,
        error: String,
    },
    Done(Text2CypherOutput),
}

// ============================================================================
// Controller
// ============================================================================

/// Generates, runs and (once) repairs Cypher for natural-language questions.
///
/// Holds only read-only state, so one instance can serve concurrent callers.
pub struct Text2Cypher {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn GraphStore>,
    prompt: PromptBuilder,
    ignore_relationship_direction: bool,
}

impl Text2Cypher {
    /// No schema, no examples, direction normalization on.
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn GraphStore>) -> Self {
        Self {
            model,
            store,
            prompt: PromptBuilder::new(),
            ignore_relationship_direction: true,
        }
    }

    /// Build from `config`, fetching the schema from the store when enabled.
    pub async fn from_config(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn GraphStore>,
        config: &Text2CypherConfig,
        examples: ExampleSet,
    ) -> Result<Self, StoreError> {
        let schema = if config.use_schema {
            Some(store.schema().await?)
        } else {
            None
        };

        Ok(Self::new(model, store)
            .with_schema(schema)
            .with_examples(examples)
            .with_ignore_relationship_direction(config.ignore_relationship_direction))
    }

    pub fn with_schema(mut self, schema: Option<Schema>) -> Self {
        self.prompt = self.prompt.with_schema(schema);
        self
    }

    pub fn with_examples(mut self, examples: ExampleSet) -> Self {
        self.prompt = self.prompt.with_examples(examples);
        self
    }

    pub fn with_ignore_relationship_direction(mut self, ignore: bool) -> Self {
        self.ignore_relationship_direction = ignore;
        self
    }

    pub fn prompt(&self) -> &PromptBuilder {
        &self.prompt
    }

    /// Answer `question` with the model's full response per generation.
    pub async fn run(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
    ) -> Result<Text2CypherOutput, Text2CypherError> {
        self.run_traced(question, history, heal_cypher, None).await
    }

    /// Like [`Text2Cypher::run`], streaming every generation through `sink`.
    pub async fn run_streaming(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
        sink: &mut dyn TokenSink,
    ) -> Result<Text2CypherOutput, Text2CypherError> {
        self.run_traced(question, history, heal_cypher, Some(sink)).await
    }

    async fn run_traced(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
        sink: Option<&mut dyn TokenSink>,
    ) -> Result<Text2CypherOutput, Text2CypherError> {
        let span = tracing::info_span!("text2cypher", run_id = %Uuid::new_v4(), heal = heal_cypher);
        self.drive(question, history, heal_cypher, sink)
            .instrument(span)
            .await
    }

    async fn drive(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
        mut sink: Option<&mut dyn TokenSink>,
    ) -> Result<Text2CypherOutput, Text2CypherError> {
        let generator = QueryGenerator::new(self.model.as_ref());
        let mut generations = 0usize;

        let mut state = State::Generating(Attempt {
            question: question.to_string(),
            history: history.to_vec(),
            healing_enabled: heal_cypher,
        });

        loop {
            state = match state {
                State::Generating(attempt) => {
                    let prompt_question = if attempt.healing_enabled {
                        format!("{QUESTION_PREFIX}{}", attempt.question)
                    } else {
                        attempt.question.clone()
                    };
                    let messages = self.prompt.build(&attempt.history, &prompt_question);
                    debug!(turns = messages.len(), model = %self.model.name(), "constructing cypher");

                    generations += 1;
                    let raw = match sink.as_deref_mut() {
                        Some(sink) => generator.generate_streaming(&messages, sink).await?,
                        None => generator.generate(&messages).await?,
                    };
                    debug!(response = %raw, "model response");

                    match extract_query(&raw) {
                        Some(cypher) => State::Extracted {
                            cypher: cypher.to_string(),
                            attempt,
                            raw,
                        },
                        None => {
                            info!("model returned no delimited cypher; surfacing as clarification");
                            State::Done(Text2CypherOutput {
                                generated_cypher: None,
                                output: QueryOutput::Clarification { message: raw },
                                generations,
                            })
                        }
                    }
                }

                State::Extracted {
                    attempt,
                    raw,
                    cypher,
                } => {
                    let cypher = if self.ignore_relationship_direction {
                        remove_relationship_direction(&cypher)
                    } else {
                        cypher
                    };
                    info!(cypher = %cypher, "executing generated cypher");

                    let result = self.store.query(&cypher).await?;
                    State::Executed {
                        attempt,
                        raw,
                        cypher,
                        result,
                    }
                }

                State::Executed {
                    attempt,
                    raw,
                    cypher,
                    result,
                } => match result {
                    ExecutionResult::QueryError { code, message }
                        if attempt.healing_enabled && result_is_syntax(&code) =>
                    {
                        warn!(code = %code, error = %message, "cypher rejected; attempting to heal once");
                        State::Healing {
                            attempt,
                            raw,
                            error: message,
                        }
                    }
                    result => {
                        if let ExecutionResult::Rows { rows } = &result {
                            info!(rows = rows.len(), "cypher executed");
                        }
                        State::Done(Text2CypherOutput {
                            generated_cypher: Some(cypher),
                            output: result.into(),
                            generations,
                        })
                    }
                },

                State::Healing {
                    attempt,
                    raw,
                    error,
                } => State::Generating(Attempt {
                    history: vec![Message::user(attempt.question), Message::assistant(raw)],
                    question: error,
                    healing_enabled: false,
                }),

                State::Done(output) => return Ok(output),
            };
        }
    }
}

fn result_is_syntax(code: &str) -> bool {
    code == crate::store::INVALID_CYPHER
}
