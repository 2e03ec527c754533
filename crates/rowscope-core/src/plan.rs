//! Compiled browse query plan

use serde::{Deserialize, Serialize};

use crate::quote::quote_identifier;
use crate::table_id::TableId;

/// Alias under which the row-identity expression is selected
pub const ROW_KEY_ALIAS: &str = "_rowid_";

/// Pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Maximum number of rows to return
    pub limit: u64,
    /// Number of rows to skip
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// First page of the given size
    pub fn first(limit: u64) -> Self {
        Self { limit, offset: 0 }
    }
}

/// One projected column: a SQL expression and the alias it is presented under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Rendered SQL expression, identifiers already quoted
    pub expr: String,
    /// Column name the expression is presented as
    pub alias: String,
}

impl Selector {
    /// Plain column selector
    pub fn column(name: &str) -> Self {
        Self {
            expr: quote_identifier(name),
            alias: name.to_string(),
        }
    }

    /// Expression selector aliased back to a column name
    pub fn expression(expr: String, alias: &str) -> Self {
        Self {
            expr,
            alias: alias.to_string(),
        }
    }

    fn render(&self) -> String {
        if self.expr == quote_identifier(&self.alias) {
            self.expr.clone()
        } else {
            format!("{} AS {}", self.expr, quote_identifier(&self.alias))
        }
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    /// Rendered SQL expression, identifiers already quoted
    pub expr: String,
    /// Sort direction
    pub ascending: bool,
}

impl OrderTerm {
    pub fn new(expr: String, ascending: bool) -> Self {
        Self { expr, ascending }
    }

    fn render(&self) -> String {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        format!("{} {}", self.expr, dir)
    }
}

/// The compiled, engine-ready representation of one browse request.
///
/// A plan is plain data: rendering it to SQL is deterministic, so identical
/// settings and structure always produce byte-identical SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// The browsed table or view
    pub table: TableId,
    /// Row-identity expression, always selected first under [`ROW_KEY_ALIAS`]
    pub row_key: String,
    /// Whether the grid shows the row-identity column
    pub show_row_key: bool,
    /// Visible columns in live structural order
    pub selectors: Vec<Selector>,
    /// WHERE conjuncts, joined with AND; empty means no WHERE clause
    pub where_clauses: Vec<String>,
    /// ORDER BY terms in precedence order
    pub order_by: Vec<OrderTerm>,
    /// Pagination window
    pub page: Page,
    /// Text encoding for decoding fetched text values; None means UTF-8
    pub encoding: Option<String>,
}

impl QueryPlan {
    /// Render the paginated SELECT for this plan
    pub fn to_sql(&self) -> String {
        let mut sql = self.select_core(true);
        sql.push_str(&format!(" LIMIT {} OFFSET {}", self.page.limit, self.page.offset));
        sql
    }

    /// Render the matching COUNT(*) query (same WHERE, no ORDER BY/pagination)
    pub fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table.qualified());
        self.push_where(&mut sql);
        sql
    }

    /// Render the unpaginated SELECT without the row-identity column, as used
    /// for exporting the filtered table
    pub fn filtered_sql(&self) -> String {
        self.select_core(false)
    }

    /// Render a CREATE VIEW statement capturing the current filter and sort
    pub fn create_view_sql(&self, view_name: &str) -> String {
        format!(
            "CREATE VIEW {} AS {}",
            quote_identifier(view_name),
            self.filtered_sql()
        )
    }

    fn select_core(&self, with_row_key: bool) -> String {
        let mut cols = Vec::with_capacity(self.selectors.len() + 1);
        if with_row_key {
            cols.push(format!(
                "{} AS {}",
                self.row_key,
                quote_identifier(ROW_KEY_ALIAS)
            ));
        }
        cols.extend(self.selectors.iter().map(Selector::render));

        let mut sql = format!("SELECT {} FROM {}", cols.join(", "), self.table.qualified());
        self.push_where(&mut sql);
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self.order_by.iter().map(OrderTerm::render).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        sql
    }

    fn push_where(&self, sql: &mut String) {
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_plan() -> QueryPlan {
        QueryPlan {
            table: TableId::in_main("people"),
            row_key: quote_identifier("_rowid_"),
            show_row_key: false,
            selectors: vec![
                Selector::column("id"),
                Selector::column("name"),
                Selector::column("age"),
            ],
            where_clauses: vec!["\"age\" > 30".to_string()],
            order_by: vec![
                OrderTerm::new(quote_identifier("name"), true),
                OrderTerm::new(quote_identifier("_rowid_"), true),
            ],
            page: Page::first(100),
            encoding: None,
        }
    }

    #[test]
    fn renders_full_select() {
        let plan = sample_plan();
        assert_eq!(
            plan.to_sql(),
            "SELECT \"_rowid_\" AS \"_rowid_\", \"id\", \"name\", \"age\" \
             FROM \"main\".\"people\" WHERE \"age\" > 30 \
             ORDER BY \"name\" ASC, \"_rowid_\" ASC LIMIT 100 OFFSET 0"
        );
    }

    #[test]
    fn count_query_drops_order_and_pagination() {
        let plan = sample_plan();
        assert_eq!(
            plan.count_sql(),
            "SELECT COUNT(*) FROM \"main\".\"people\" WHERE \"age\" > 30"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = sample_plan();
        let b = sample_plan();
        assert_eq!(a, b);
        assert_eq!(a.to_sql(), b.to_sql());
    }

    #[test]
    fn expression_selector_gets_alias() {
        let mut plan = sample_plan();
        plan.selectors[2] =
            Selector::expression("strftime('%Y-%m-%d', \"age\")".to_string(), "age");
        assert!(
            plan.to_sql()
                .contains("strftime('%Y-%m-%d', \"age\") AS \"age\"")
        );
    }

    #[test]
    fn create_view_wraps_filtered_select() {
        let plan = sample_plan();
        assert_eq!(
            plan.create_view_sql("adults"),
            "CREATE VIEW \"adults\" AS SELECT \"id\", \"name\", \"age\" \
             FROM \"main\".\"people\" WHERE \"age\" > 30 \
             ORDER BY \"name\" ASC, \"_rowid_\" ASC"
        );
    }

    #[test]
    fn empty_filter_set_has_no_where_clause() {
        let mut plan = sample_plan();
        plan.where_clauses.clear();
        assert!(!plan.to_sql().contains("WHERE"));
        assert!(!plan.count_sql().contains("WHERE"));
    }
}
