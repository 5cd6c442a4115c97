//! Few-shot question/query examples.
//!
//! Examples are rendered in the annotated form the generation prompt expects:
//! each question on a `#`-prefixed line followed by its Cypher. Free text
//! (extra guidance for the model) may follow the pairs and is kept verbatim.

use crate::error::ConfigError;
use std::path::Path;

/// Immutable, ordered example text injected into the system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleSet {
    text: String,
}

impl ExampleSet {
    /// Build from `(question, query)` pairs, preserving order.
    pub fn from_pairs<I, Q, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Q, C)>,
        Q: AsRef<str>,
        C: AsRef<str>,
    {
        let text = pairs
            .into_iter()
            .map(|(q, c)| format!("#{}\n{}", q.as_ref().trim(), c.as_ref().trim()))
            .collect::<Vec<_>>()
            .join("\n");
        Self { text }
    }

    /// Use annotated example text as-is.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_text(text))
    }

    pub fn render(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Parse the `(question, query)` pairs back out of the text.
    ///
    /// A pair ends at the next `#` line or at the first blank line; anything
    /// after that blank line that is not a new question is treated as free
    /// text and skipped.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;

        for line in self.text.lines() {
            let trimmed = line.trim();
            if let Some(question) = trimmed.strip_prefix('#') {
                if let Some((q, body)) = current.take() {
                    pairs.push((q, body.join("\n")));
                }
                current = Some((question.trim().to_string(), Vec::new()));
            } else if trimmed.is_empty() {
                if let Some((q, body)) = current.take() {
                    pairs.push((q, body.join("\n")));
                }
            } else if let Some((_, body)) = current.as_mut() {
                body.push(line.trim_end());
            }
        }
        if let Some((q, body)) = current {
            pairs.push((q, body.join("\n")));
        }

        pairs.retain(|(_, body)| !body.trim().is_empty());
        pairs
    }

    pub fn len(&self) -> usize {
        self.pairs().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_pairs_renders_annotated_form() {
        let set = ExampleSet::from_pairs([
            (
                "How many people are there?",
                "MATCH (n:Person)\nRETURN count(n) AS people",
            ),
            ("Who acted in Heat?", "MATCH (p)-[:ACTED_IN]->(:Movie {title: 'Heat'}) RETURN p"),
        ]);

        assert_eq!(
            set.render(),
            "#How many people are there?\nMATCH (n:Person)\nRETURN count(n) AS people\n\
             #Who acted in Heat?\nMATCH (p)-[:ACTED_IN]->(:Movie {title: 'Heat'}) RETURN p"
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_pairs_skip_trailing_guidance() {
        let set = ExampleSet::from_text(
            "#Count societies\nMATCH (n:NationalSociety)\nRETURN count(n)\n\n\
             Never use the CONTAINS clause on text chunks.\n",
        );
        let pairs = set.pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "Count societies");
        assert_eq!(pairs[0].1, "MATCH (n:NationalSociety)\nRETURN count(n)");
        assert!(set.render().contains("CONTAINS"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#Q\nMATCH (n) RETURN n").unwrap();

        let set = ExampleSet::load(file.path()).unwrap();
        assert_eq!(set.render(), "#Q\nMATCH (n) RETURN n");
        assert!(!set.is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ExampleSet::load(Path::new("/nonexistent/examples.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
