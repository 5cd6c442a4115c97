//! Prompt construction for Cypher generation.

use crate::examples::ExampleSet;
use crate::schema::Schema;
use crate::Message;

/// Marker pair that wraps the generated query in model output. Shared with
/// [`crate::extract::extract_query`].
pub const QUERY_DELIMITER: &str = "```";

/// Prefix added to the user's question on a first (non-healing) attempt.
pub const QUESTION_PREFIX: &str = "Question to be converted to Cypher: ";

const TASK_INSTRUCTIONS: &str = r#"Your task is to convert questions about the contents of a Neo4j database into Cypher queries that will return the data needed to answer those questions.
A Neo4j database represents data as nodes representing entities that are connected to each other through relationships.
Nodes can be identified by one or more labels, and can have one or more properties.
Relationships can be identified by a type, and can have one or more properties.
Paths are sequences of nodes and relationships. The following is an example of a path:
(n1:Label1 {property1: value1})-[:TYPE {property2: value2}]->(n2:Label2 {property3: value3})
"#;

/// Builds the message list sent to the model. Holds only read-only inputs.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    schema: Option<Schema>,
    examples: ExampleSet,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject `schema` into the system prompt. Pass `None` to leave it out.
    pub fn with_schema(mut self, schema: Option<Schema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_examples(mut self, examples: ExampleSet) -> Self {
        self.examples = examples;
        self
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn examples(&self) -> &ExampleSet {
        &self.examples
    }

    /// The fixed instructions plus the schema and example blocks that apply.
    pub fn system_message(&self) -> String {
        let mut system = String::from(TASK_INSTRUCTIONS);

        if let Some(schema) = self.schema.as_ref().filter(|s| !s.is_empty()) {
            system.push_str(&format!(
                "\nThe schema of the Neo4j database is indicated below between triple backticks.\n\
                 Schema:\n\
                 {QUERY_DELIMITER}{schema}{QUERY_DELIMITER}\n\
                 Use only the node labels, node properties, relationship types and relationship \
                 properties that you find in the schema to construct a Cypher statement.\n"
            ));
        }

        if !self.examples.is_empty() {
            system.push_str(&format!(
                "\nUse the example questions and associated Cypher statements below, delimited by \
                 triple backticks, as a guide to construct a Cypher statement.\n\
                 Example questions and Cypher statements:\n\
                 {QUERY_DELIMITER}{}{QUERY_DELIMITER}\n",
                self.examples.render()
            ));
        }

        system.push_str(&format!(
            "\nIMPORTANT NOTES FOR YOUR RESPONSE:\n\
             0. Wrap the generated Cypher statement in triple backticks ({QUERY_DELIMITER}). \
             This is essential for the evaluation of your response.\n\
             1. Use the message history to provide additional context if needed.\n\
             2. You may ask the user to provide additional information if needed.\n\
             3. Do not include any text except the generated Cypher statement or a question \
             asking for additional information to help you generate a Cypher statement.\n\
             4. Do not include any explanations or apologies in your responses.\n\
             5. Do not respond to any questions that might ask anything else than for you to \
             construct a Cypher statement.\n\
             \n\
             VERY IMPORTANT NOTE: Wrap the generated Cypher statement in triple backticks \
             ({QUERY_DELIMITER}).\n"
        ));

        system
    }

    /// `[system] + history + [user: question]`
    pub fn build(&self, history: &[Message], question: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_message()));
        messages.extend_from_slice(history);
        messages.push(Message::user(question));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn test_bare_prompt_has_contract_but_no_blocks() {
        let system = PromptBuilder::new().system_message();
        assert!(system.contains("triple backticks (```)"));
        assert!(system.contains("Do not include any explanations or apologies"));
        assert!(!system.contains("Schema:"));
        assert!(!system.contains("Example questions"));
    }

    #[test]
    fn test_schema_block_only_when_non_empty() {
        let with = PromptBuilder::new()
            .with_schema(Some(Schema::new("Person {name: String}")))
            .system_message();
        assert!(with.contains("Schema:\n```Person {name: String}```"));

        let blank = PromptBuilder::new()
            .with_schema(Some(Schema::new("")))
            .system_message();
        assert!(!blank.contains("Schema:"));
    }

    #[test]
    fn test_examples_block() {
        let system = PromptBuilder::new()
            .with_examples(ExampleSet::from_pairs([("Count", "MATCH (n) RETURN count(n)")]))
            .system_message();
        assert!(system.contains("```#Count\nMATCH (n) RETURN count(n)```"));
    }

    #[test]
    fn test_build_orders_turns() {
        let history = vec![Message::user("earlier"), Message::assistant("```MATCH (n) RETURN n```")];
        let messages = PromptBuilder::new().build(&history, "now");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1], history[0]);
        assert_eq!(messages[2], history[1]);
        assert_eq!(messages[3], Message::user("now"));
    }
}
