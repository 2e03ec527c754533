//! Column metadata and type affinity

use serde::{Deserialize, Serialize};

/// SQLite type affinity, derived from a column's declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affinity {
    Integer,
    Real,
    Numeric,
    Text,
    Blob,
}

impl Affinity {
    /// Derive the affinity from a declared column type.
    ///
    /// Follows the SQLite rules in order: INT wins over everything, then
    /// CHAR/CLOB/TEXT, then BLOB (or no declared type), then REAL/FLOA/DOUB,
    /// and anything else gets NUMERIC.
    pub fn from_decl_type(decl_type: &str) -> Self {
        let upper = decl_type.to_uppercase();
        if upper.contains("INT") {
            Affinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Affinity::Text
        } else if upper.is_empty() || upper.contains("BLOB") {
            Affinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    /// Whether comparisons against this column should prefer numeric semantics
    pub fn is_numeric(&self) -> bool {
        matches!(self, Affinity::Integer | Affinity::Real | Affinity::Numeric)
    }
}

/// One entry of a live structure snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type from the schema (may be empty for untyped columns)
    pub decl_type: String,
    /// Affinity derived from the declared type
    pub affinity: Affinity,
}

impl Column {
    /// Create a column, deriving its affinity from the declared type
    pub fn new(name: impl Into<String>, decl_type: impl Into<String>) -> Self {
        let decl_type = decl_type.into();
        let affinity = Affinity::from_decl_type(&decl_type);
        Self {
            name: name.into(),
            decl_type,
            affinity,
        }
    }
}
