//! Question in, answer out: text2cypher followed by summarization.

use crate::error::Text2CypherError;
use crate::healing::{QueryOutput, Text2Cypher, Text2CypherOutput};
use crate::llm::TokenSink;
use crate::summarize::Summarizer;
use crate::{Message, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantAnswer {
    pub generated_cypher: Option<String>,
    /// Row view of the query output (data, error row or clarification row)
    pub rows: Vec<Row>,
    pub answer: String,
    pub healed: bool,
}

pub struct GraphQaAssistant {
    text2cypher: Text2Cypher,
    summarizer: Summarizer,
}

impl GraphQaAssistant {
    pub fn new(text2cypher: Text2Cypher, summarizer: Summarizer) -> Self {
        Self {
            text2cypher,
            summarizer,
        }
    }

    pub fn text2cypher(&self) -> &Text2Cypher {
        &self.text2cypher
    }

    pub async fn ask(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
    ) -> Result<AssistantAnswer, Text2CypherError> {
        let output = self.text2cypher.run(question, history, heal_cypher).await?;
        let answer = match clarification(&output) {
            Some(message) => message.to_string(),
            None => {
                self.summarizer
                    .summarize(question, &output.output.to_rows())
                    .await?
            }
        };
        Ok(answer_from(output, answer))
    }

    /// Generate the query without streaming, then stream the summary.
    ///
    /// A clarification is forwarded to `sink` as a single fragment.
    pub async fn ask_streaming(
        &self,
        question: &str,
        history: &[Message],
        heal_cypher: bool,
        sink: &mut dyn TokenSink,
    ) -> Result<AssistantAnswer, Text2CypherError> {
        let output = self.text2cypher.run(question, history, heal_cypher).await?;
        let answer = match clarification(&output) {
            Some(message) => {
                sink.on_token(message).await?;
                message.to_string()
            }
            None => {
                self.summarizer
                    .summarize_streaming(question, &output.output.to_rows(), sink)
                    .await?
            }
        };
        Ok(answer_from(output, answer))
    }
}

fn clarification(output: &Text2CypherOutput) -> Option<&str> {
    match &output.output {
        QueryOutput::Clarification { message } => Some(message),
        _ => None,
    }
}

fn answer_from(output: Text2CypherOutput, answer: String) -> AssistantAnswer {
    AssistantAnswer {
        rows: output.output.to_rows(),
        healed: output.healed(),
        generated_cypher: output.generated_cypher,
        answer,
    }
}
