//! Graph schema text injected into generation prompts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pre-fetched, opaque description of node labels, relationship types and
/// their properties. The prompt builder injects it verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(String);

impl Schema {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Schema {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Schema {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// A property and the store's type names for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    pub types: Vec<String>,
}

/// Structured schema as discovered from the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Node label → properties
    pub node_properties: Vec<(String, Vec<PropertySchema>)>,
    /// Relationship type → properties
    pub relationship_properties: Vec<(String, Vec<PropertySchema>)>,
    /// `(:From)-[:TYPE]->(:To)` patterns
    pub relationships: Vec<String>,
}

impl GraphSchema {
    /// Add a property to a node label, keeping first-seen label order.
    pub fn add_node_property(&mut self, label: &str, property: PropertySchema) {
        push_grouped(&mut self.node_properties, label, property);
    }

    pub fn add_relationship_property(&mut self, rel_type: &str, property: PropertySchema) {
        push_grouped(&mut self.relationship_properties, rel_type, property);
    }

    pub fn add_relationship(&mut self, from: &str, rel_type: &str, to: &str) {
        let pattern = format!("(:{from})-[:{rel_type}]->(:{to})");
        if !self.relationships.contains(&pattern) {
            self.relationships.push(pattern);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_properties.is_empty()
            && self.relationship_properties.is_empty()
            && self.relationships.is_empty()
    }

    /// Render into the textual form handed to the model.
    pub fn render(&self) -> Schema {
        let mut out = String::new();

        out.push_str("Node properties are the following:\n");
        out.push_str(&render_grouped(&self.node_properties));
        out.push_str("\nRelationship properties are the following:\n");
        out.push_str(&render_grouped(&self.relationship_properties));
        out.push_str("\nThe relationships are the following:\n");
        out.push_str(&self.relationships.join(", "));

        Schema(out)
    }
}

fn push_grouped(groups: &mut Vec<(String, Vec<PropertySchema>)>, key: &str, prop: PropertySchema) {
    match groups.iter_mut().find(|(k, _)| k == key) {
        Some((_, props)) => props.push(prop),
        None => groups.push((key.to_string(), vec![prop])),
    }
}

fn render_grouped(groups: &[(String, Vec<PropertySchema>)]) -> String {
    groups
        .iter()
        .map(|(key, props)| {
            let props = props
                .iter()
                .map(|p| format!("{}: {}", p.name, p.types.join("|")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{key} {{{props}}}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, ty: &str) -> PropertySchema {
        PropertySchema {
            name: name.to_string(),
            types: vec![ty.to_string()],
        }
    }

    #[test]
    fn test_render_groups_by_label() {
        let mut schema = GraphSchema::default();
        schema.add_node_property("Person", prop("name", "String"));
        schema.add_node_property("Movie", prop("title", "String"));
        schema.add_node_property("Person", prop("born", "Long"));
        schema.add_relationship_property("ACTED_IN", prop("role", "String"));
        schema.add_relationship("Person", "ACTED_IN", "Movie");
        schema.add_relationship("Person", "ACTED_IN", "Movie");

        let text = schema.render();
        assert!(text
            .as_str()
            .contains("Person {name: String, born: Long}, Movie {title: String}"));
        assert!(text.as_str().contains("ACTED_IN {role: String}"));
        assert!(text
            .as_str()
            .ends_with("(:Person)-[:ACTED_IN]->(:Movie)"));
        assert_eq!(schema.relationships.len(), 1);
    }

    #[test]
    fn test_blank_schema_is_empty() {
        assert!(Schema::new("  \n").is_empty());
        assert!(!Schema::new("Person {name: String}").is_empty());
        assert!(GraphSchema::default().is_empty());
    }
}
