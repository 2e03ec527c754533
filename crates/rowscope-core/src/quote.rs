//! SQL quoting helpers shared by the plan renderer and the filter compiler

/// Quote an identifier for SQLite, doubling embedded quote characters
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting_doubles_embedded_quotes() {
        assert_eq!(quote_identifier("name"), "\"name\"");
        assert_eq!(quote_identifier("weird \"name\""), "\"weird \"\"name\"\"\"");
    }

    #[test]
    fn string_quoting_doubles_single_quotes() {
        assert_eq!(quote_string("hello"), "'hello'");
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string("'; DROP TABLE x; --"), "'''; DROP TABLE x; --'");
    }
}
