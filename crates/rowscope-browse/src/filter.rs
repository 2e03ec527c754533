//! Filter grammar, SQL compilation, and in-memory evaluation
//!
//! Filter strings are parsed into [`FilterExpr`] values, which render as
//! WHERE conjuncts for query building and also evaluate directly against
//! fetched values for conditional formatting. Both paths share one grammar
//! so a filter promoted to a format rule keeps its meaning.
//!
//! Grammar, first match wins:
//! `>= <= <> != > < =` followed by an operand, `lo~hi` inclusive ranges,
//! `LIKE` / `NOT LIKE` with a user pattern, and bare text as a
//! case-insensitive substring match.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rowscope_core::{quote_string, Affinity, Column, Value};
use thiserror::Error;

/// Why a filter string could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("Missing operand after '{0}'")]
    MissingOperand(&'static str),
    #[error("Range filter needs both bounds")]
    IncompleteRange,
    #[error("LIKE pattern is empty")]
    EmptyPattern,
    #[error("Substring matching is not available for BLOB columns")]
    BlobContains,
    #[error("No visible column accepts this filter")]
    NoEligibleColumn,
}

/// Comparison operators of the filter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn accepts(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    /// Comparison against a single operand
    Compare { op: CompareOp, operand: String },
    /// Inclusive range written as `lo~hi`
    Between { low: String, high: String },
    /// LIKE or NOT LIKE with the user's own pattern, kept verbatim
    Like { pattern: String, negated: bool },
    /// Bare text, matched as a case-insensitive substring
    Contains { needle: String },
}

impl FilterExpr {
    /// Parse one filter string. Callers treat empty input as "no filter" and
    /// never get here with it.
    pub fn parse(input: &str) -> Result<FilterExpr, FilterParseError> {
        let trimmed = input.trim();

        // two-character operators first so ">=" never parses as ">" "=..."
        const COMPARE_OPS: [(&str, CompareOp); 7] = [
            (">=", CompareOp::Ge),
            ("<=", CompareOp::Le),
            ("<>", CompareOp::Ne),
            ("!=", CompareOp::Ne),
            (">", CompareOp::Gt),
            ("<", CompareOp::Lt),
            ("=", CompareOp::Eq),
        ];
        for (token, op) in COMPARE_OPS {
            if let Some(rest) = trimmed.strip_prefix(token) {
                let operand = rest.trim();
                if operand.is_empty() {
                    return Err(FilterParseError::MissingOperand(token));
                }
                return Ok(FilterExpr::Compare {
                    op,
                    operand: operand.to_string(),
                });
            }
        }

        if let Some(rest) = strip_keyword(trimmed, "NOT") {
            if let Some(pattern) = strip_keyword(rest, "LIKE") {
                return like_expr(pattern, true);
            }
        }
        if let Some(pattern) = strip_keyword(trimmed, "LIKE") {
            return like_expr(pattern, false);
        }

        if let Some((low, high)) = trimmed.split_once('~') {
            let (low, high) = (low.trim(), high.trim());
            if low.is_empty() || high.is_empty() {
                return Err(FilterParseError::IncompleteRange);
            }
            return Ok(FilterExpr::Between {
                low: low.to_string(),
                high: high.to_string(),
            });
        }

        Ok(FilterExpr::Contains {
            needle: trimmed.to_string(),
        })
    }

    /// Render this expression as a WHERE conjunct over `selector`, the SQL
    /// expression the column is selected as.
    pub fn to_sql(&self, selector: &str, affinity: Affinity) -> Result<String, FilterParseError> {
        match self {
            FilterExpr::Compare { op, operand } => Ok(format!(
                "{} {} {}",
                selector,
                op.sql(),
                literal(operand, affinity)
            )),
            FilterExpr::Between { low, high } => Ok(format!(
                "{} BETWEEN {} AND {}",
                selector,
                literal(low, affinity),
                literal(high, affinity)
            )),
            FilterExpr::Like { pattern, negated } => {
                let keyword = if *negated { "NOT LIKE" } else { "LIKE" };
                Ok(format!("{} {} {}", selector, keyword, quote_string(pattern)))
            }
            FilterExpr::Contains { needle } => {
                if affinity == Affinity::Blob {
                    return Err(FilterParseError::BlobContains);
                }
                let pattern = format!("%{}%", escape_like(needle));
                Ok(format!(
                    "{} LIKE {} ESCAPE '\\'",
                    selector,
                    quote_string(&pattern)
                ))
            }
        }
    }

    /// Evaluate this expression against one value, mirroring the SQL the
    /// compiler emits. NULL never matches, not even negated operators.
    pub fn matches(&self, value: &Value, affinity: Affinity) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            FilterExpr::Compare { op, operand } => compare_value(value, operand, affinity)
                .map(|ord| op.accepts(ord))
                .unwrap_or(false),
            FilterExpr::Between { low, high } => {
                let lo = compare_value(value, low, affinity);
                let hi = compare_value(value, high, affinity);
                matches!(lo, Some(Ordering::Greater | Ordering::Equal))
                    && matches!(hi, Some(Ordering::Less | Ordering::Equal))
            }
            FilterExpr::Like { pattern, negated } => {
                // blobs never match text patterns, in either polarity
                let Some(text) = value_text(value) else {
                    return false;
                };
                like_match(pattern, &text) != *negated
            }
            FilterExpr::Contains { needle } => match value {
                Value::Blob(_) => false,
                _ => value_text(value)
                    .map(|text| contains_ci(&text, needle))
                    .unwrap_or(false),
            },
        }
    }
}

fn like_expr(raw: &str, negated: bool) -> Result<FilterExpr, FilterParseError> {
    let pattern = unquote_pattern(raw);
    if pattern.is_empty() {
        return Err(FilterParseError::EmptyPattern);
    }
    Ok(FilterExpr::Like { pattern, negated })
}

/// Strip a leading keyword followed by whitespace, case-insensitively
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    // get() rather than slicing: the cut may land inside a multibyte char
    let head = input.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        let rest = &input[keyword.len()..];
        if rest.starts_with(char::is_whitespace) {
            return Some(rest.trim_start());
        }
    }
    None
}

/// Drop optional surrounding single quotes and undo doubled inner quotes
fn unquote_pattern(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

/// Render an operand as a SQL literal. Numeric columns compare numerically
/// when the operand is a number, everything else compares as quoted text.
fn literal(operand: &str, affinity: Affinity) -> String {
    if affinity.is_numeric() && is_numeric_literal(operand) {
        operand.to_string()
    } else {
        quote_string(operand)
    }
}

fn is_numeric_literal(text: &str) -> bool {
    // finite only, "inf" and "nan" are not valid SQL numerics
    text.parse::<i64>().is_ok() || text.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// Escape LIKE metacharacters so a needle matches itself literally
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(text) => Some(text.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

/// Compare a cell value against a filter operand. Numeric columns compare
/// numerically when both sides convert, otherwise text ordering applies.
/// Blobs compare as nothing and never match.
fn compare_value(value: &Value, operand: &str, affinity: Affinity) -> Option<Ordering> {
    if affinity.is_numeric() && is_numeric_literal(operand) {
        if let Some(lhs) = value.as_f64() {
            return lhs.partial_cmp(&operand.parse::<f64>().ok()?);
        }
    }
    let lhs = value_text(value)?;
    Some(lhs.as_str().cmp(operand))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// SQLite LIKE semantics: `%` matches any sequence, `_` any single
/// character, ASCII case-insensitive, no escape character.
fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let t: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

/// One filter dropped during compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFilter {
    /// Column ordinal, or `None` for a global filter term
    pub column: Option<usize>,
    /// The filter text as the user typed it
    pub input: String,
    pub reason: FilterParseError,
}

/// Filters dropped while compiling a plan. An empty report means every
/// active filter made it into the WHERE clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub skipped: Vec<SkippedFilter>,
}

impl FilterReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    fn skip(&mut self, column: Option<usize>, input: &str, reason: FilterParseError) {
        tracing::debug!(column = ?column, filter = %input, %reason, "filter skipped");
        self.skipped.push(SkippedFilter {
            column,
            input: input.to_string(),
            reason,
        });
    }
}

/// Live structure the compiler resolves ordinals against. `selectors` runs
/// parallel to `columns` and carries each column's selector SQL with any
/// display format already applied.
pub struct FilterContext<'a> {
    pub columns: &'a [Column],
    pub selectors: &'a [String],
    pub hidden: &'a BTreeMap<usize, bool>,
}

impl FilterContext<'_> {
    fn is_hidden(&self, ordinal: usize) -> bool {
        self.hidden.get(&ordinal).copied().unwrap_or(false)
    }
}

/// Compile per-column and global filters into WHERE conjuncts.
///
/// Per-column filters compile in ordinal order. Each global term becomes one
/// parenthesized OR across all visible columns that accept it. A filter that
/// fails to compile is skipped and reported, never a hard error.
pub fn compile_filters(
    filters: &BTreeMap<usize, String>,
    global_filters: &[String],
    ctx: &FilterContext<'_>,
) -> (Vec<String>, FilterReport) {
    let mut clauses = Vec::new();
    let mut report = FilterReport::default();

    for (&ordinal, text) in filters {
        if text.trim().is_empty() {
            continue;
        }
        let (Some(column), Some(selector)) =
            (ctx.columns.get(ordinal), ctx.selectors.get(ordinal))
        else {
            // stale ordinal, reconciliation has not caught up yet
            tracing::debug!(ordinal, filter = %text, "skipping filter on out-of-range column");
            continue;
        };
        match FilterExpr::parse(text).and_then(|expr| expr.to_sql(selector, column.affinity)) {
            Ok(fragment) => clauses.push(fragment),
            Err(reason) => report.skip(Some(ordinal), text, reason),
        }
    }

    for term in global_filters {
        if term.trim().is_empty() {
            continue;
        }
        let expr = match FilterExpr::parse(term) {
            Ok(expr) => expr,
            Err(reason) => {
                report.skip(None, term, reason);
                continue;
            }
        };
        let mut branches = Vec::new();
        for (ordinal, column) in ctx.columns.iter().enumerate() {
            if ctx.is_hidden(ordinal) {
                continue;
            }
            let Some(selector) = ctx.selectors.get(ordinal) else {
                continue;
            };
            if let Ok(fragment) = expr.to_sql(selector, column.affinity) {
                branches.push(fragment);
            }
        }
        if branches.is_empty() {
            report.skip(None, term, FilterParseError::NoEligibleColumn);
        } else {
            clauses.push(format!("({})", branches.join(" OR ")));
        }
    }

    (clauses, report)
}
