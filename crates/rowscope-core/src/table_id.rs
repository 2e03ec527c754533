//! Stable table identity

use serde::{Deserialize, Serialize};

use crate::quote::quote_identifier;

/// Stable (schema, name) key identifying a browsable table or view.
///
/// Equality is structural; the same object reached through different
/// connections or sessions has the same identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId {
    /// Schema or attached-database name
    pub schema: String,
    /// Object name
    pub name: String,
}

impl TableId {
    /// Create a table identity
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Create an identity in the default `main` schema
    pub fn in_main(name: impl Into<String>) -> Self {
        Self::new("main", name)
    }

    /// Schema-qualified, quoted reference for use in SQL
    pub fn qualified(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.name)
        )
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_reference_is_quoted() {
        let id = TableId::in_main("people");
        assert_eq!(id.qualified(), "\"main\".\"people\"");

        let odd = TableId::new("main", "weird \"table\"");
        assert_eq!(odd.qualified(), "\"main\".\"weird \"\"table\"\"\"");
    }
}
