//! Natural-language answers from query rows.

use crate::error::LlmError;
use crate::llm::{LanguageModel, QueryGenerator, TokenSink};
use crate::{Message, Row};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Lists longer than this are dropped (embeddings).
pub const LIST_CUTOFF: usize = 56;

/// Strings are cut to this many characters.
pub const CHARACTER_CUTOFF: usize = 5000;

const SUMMARY_SYSTEM_PROMPT: &str = "\
Your task is to generate a natural language answer to a given question based on given data.
Do not mention that your answer is based on the given data.
Do not add any additional information that is not explicitly provided in the given data.
I repeat, do not add any information that is not explicitly given.
Make the answer as concise as possible and do not use more than 100 words.
Use bullet points for lists longer than three items.";

/// Null out long lists and truncate long strings, recursing into nested
/// objects. Lists themselves are not descended into.
pub fn remove_large_values(mut row: Row) -> Row {
    for value in row.values_mut() {
        shrink(value);
    }
    row
}

fn shrink(value: &mut Value) {
    if matches!(value, Value::Array(items) if items.len() > LIST_CUTOFF) {
        *value = Value::Null;
        return;
    }
    match value {
        Value::String(s) => {
            if let Some((cut, _)) = s.char_indices().nth(CHARACTER_CUTOFF) {
                s.truncate(cut);
            }
        }
        Value::Object(map) => map.values_mut().for_each(shrink),
        _ => {}
    }
}

/// Turns a question and its result rows into a short prose answer.
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    exclude_embeddings: bool,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>, exclude_embeddings: bool) -> Self {
        Self {
            model,
            exclude_embeddings,
        }
    }

    pub fn user_prompt(&self, question: &str, rows: &[Row]) -> String {
        let rows: Vec<Row> = if self.exclude_embeddings {
            rows.iter().cloned().map(remove_large_values).collect()
        } else {
            rows.to_vec()
        };
        let data = serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string());

        format!(
            "Answer the question below, delimited by triple backticks.\n\
             Question: ```{question}```\n\
             Answer the question using the following data, delimited by triple backticks.\n\
             Data:\n\
             ```{data}```"
        )
    }

    pub fn messages(&self, question: &str, rows: &[Row]) -> Vec<Message> {
        vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(self.user_prompt(question, rows)),
        ]
    }

    pub async fn summarize(&self, question: &str, rows: &[Row]) -> Result<String, LlmError> {
        let messages = self.messages(question, rows);
        debug!(rows = rows.len(), "summarizing query results");
        QueryGenerator::new(self.model.as_ref()).generate(&messages).await
    }

    /// Stream the summary through `sink`; returns the full text.
    pub async fn summarize_streaming(
        &self,
        question: &str,
        rows: &[Row],
        sink: &mut dyn TokenSink,
    ) -> Result<String, LlmError> {
        let messages = self.messages(question, rows);
        debug!(rows = rows.len(), "streaming summary of query results");
        QueryGenerator::new(self.model.as_ref())
            .generate_streaming(&messages, sink)
            .await
    }
}
