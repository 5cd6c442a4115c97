//! Direction-insensitive rewriting of generated Cypher.

/// Collapse `->` and `<-` into the undirected connector `-`.
///
/// Only arrow tokens are touched, so `(a)-[:R]->(b)` becomes `(a)-[:R]-(b)`.
/// Applying it twice gives the same result as applying it once.
pub fn remove_relationship_direction(cypher: &str) -> String {
    cypher.replace("->", "-").replace("<-", "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_arrow() {
        assert_eq!(
            remove_relationship_direction("(a)-[:R]->(b)"),
            "(a)-[:R]-(b)"
        );
    }

    #[test]
    fn test_left_arrow() {
        assert_eq!(
            remove_relationship_direction("(a)<-[:R]-(b)"),
            "(a)-[:R]-(b)"
        );
    }

    #[test]
    fn test_idempotent() {
        let once = remove_relationship_direction("(a)-[:R]->(b)<-[:S]-(c)");
        assert_eq!(remove_relationship_direction(&once), once);
        assert_eq!(once, "(a)-[:R]-(b)-[:S]-(c)");
    }

    #[test]
    fn test_other_text_untouched() {
        let q = "MATCH (n) WHERE n.age > 3 AND n.score < 4 RETURN n";
        assert_eq!(remove_relationship_direction(q), q);
    }
}
