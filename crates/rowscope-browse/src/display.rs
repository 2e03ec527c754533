//! Display formats
//!
//! A display format rewrites a column's selector so formatting happens in the
//! database, inside the same query that filters and sorts. Filters on a
//! formatted column compare against the formatted text, which is what the
//! user sees on screen.

use rowscope_core::quote_identifier;
use serde::{Deserialize, Serialize};

/// How a column's values are rewritten for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    /// Scientific notation via `printf('%e', ...)`
    Exponent,
    /// Fraction rendered as a percentage with two decimals
    Percent,
    /// Hexadecimal dump of blob content
    HexBlob,
    /// `YYYY-MM-DD` from a date-like value
    DateIso,
    /// `HH:MM:SS` from a time-like value
    TimeIso,
    /// `YYYY-MM-DD HH:MM:SS` from a datetime-like value
    DateTimeIso,
    /// Local datetime from Unix epoch seconds
    UnixEpoch,
    /// Datetime from a Julian day number
    JulianDay,
    /// User-authored SQL expression; `%1` stands for the quoted column
    Custom(String),
}

impl DisplayFormat {
    /// Selector expression for `column` under this format
    pub fn selector_sql(&self, column: &str) -> String {
        let col = quote_identifier(column);
        match self {
            DisplayFormat::Exponent => format!("printf('%e', {col})"),
            DisplayFormat::Percent => format!("printf('%.2f%%', {col} * 100.0)"),
            DisplayFormat::HexBlob => format!("hex({col})"),
            DisplayFormat::DateIso => format!("strftime('%Y-%m-%d', {col})"),
            DisplayFormat::TimeIso => format!("strftime('%H:%M:%S', {col})"),
            DisplayFormat::DateTimeIso => format!("strftime('%Y-%m-%d %H:%M:%S', {col})"),
            DisplayFormat::UnixEpoch => format!("datetime({col}, 'unixepoch')"),
            DisplayFormat::JulianDay => format!("datetime({col})"),
            DisplayFormat::Custom(expr) => format!("({})", expr.replace("%1", &col)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_formats_wrap_the_quoted_column() {
        assert_eq!(
            DisplayFormat::Exponent.selector_sql("value"),
            r#"printf('%e', "value")"#
        );
        assert_eq!(
            DisplayFormat::Percent.selector_sql("ratio"),
            r#"printf('%.2f%%', "ratio" * 100.0)"#
        );
        assert_eq!(DisplayFormat::HexBlob.selector_sql("data"), r#"hex("data")"#);
        assert_eq!(
            DisplayFormat::UnixEpoch.selector_sql("created"),
            r#"datetime("created", 'unixepoch')"#
        );
        assert_eq!(
            DisplayFormat::DateTimeIso.selector_sql("ts"),
            r#"strftime('%Y-%m-%d %H:%M:%S', "ts")"#
        );
    }

    #[test]
    fn custom_format_substitutes_the_placeholder() {
        let format = DisplayFormat::Custom("round(%1 / 1024.0, 1) || ' KiB'".to_string());
        assert_eq!(
            format.selector_sql("size"),
            r#"(round("size" / 1024.0, 1) || ' KiB')"#
        );
    }

    #[test]
    fn quoting_survives_hostile_column_names() {
        assert_eq!(
            DisplayFormat::HexBlob.selector_sql(r#"we"ird"#),
            r#"hex("we""ird")"#
        );
    }
}
