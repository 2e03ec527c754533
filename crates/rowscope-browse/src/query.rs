//! Query construction from browse settings
//!
//! Turns one table's settings plus its live column list into an executable
//! [`QueryPlan`]. Construction is pure and deterministic: the same inputs
//! always render byte-identical SQL, so callers can compare plans to skip
//! redundant refreshes.

use rowscope_core::{
    quote_identifier, Column, OrderTerm, Page, QueryPlan, Selector, TableId, ROW_KEY_ALIAS,
};

use crate::filter::{compile_filters, FilterContext, FilterReport};
use crate::settings::{BrowseSettings, SortOrder};

/// Kind of browsed object. Views have no native rowid, so their row
/// identity comes from the unlock column or is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

/// Build the query plan for one page of `table`.
///
/// Stale sort and filter ordinals are dropped on the fly; dropped filters
/// that fail to compile for other reasons come back in the report.
pub fn build_query(
    table: &TableId,
    kind: ObjectKind,
    settings: &BrowseSettings,
    columns: &[Column],
    page: Page,
    encoding: Option<String>,
) -> (QueryPlan, FilterReport) {
    let row_key = row_key_expr(kind, settings);

    // selector SQL per ordinal, display formats applied; filters compare
    // against these same expressions
    let selector_exprs: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(ordinal, column)| match settings.display_formats.get(&ordinal) {
            Some(format) => format.selector_sql(&column.name),
            None => quote_identifier(&column.name),
        })
        .collect();

    let selectors: Vec<Selector> = columns
        .iter()
        .enumerate()
        .filter(|(ordinal, _)| !settings.is_column_hidden(*ordinal))
        .map(|(ordinal, column)| Selector::expression(selector_exprs[ordinal].clone(), &column.name))
        .collect();

    let ctx = FilterContext {
        columns,
        selectors: &selector_exprs,
        hidden: &settings.hidden_columns,
    };
    let (where_clauses, report) = compile_filters(&settings.filters, &settings.global_filters, &ctx);

    let mut order_by: Vec<OrderTerm> = Vec::new();
    for criterion in &settings.sort {
        let Some(column) = columns.get(criterion.column) else {
            tracing::debug!(ordinal = criterion.column, "dropping out-of-range sort entry");
            continue;
        };
        order_by.push(OrderTerm::new(
            quote_identifier(&column.name),
            criterion.order == SortOrder::Ascending,
        ));
    }
    // row identity as the final tiebreaker makes paging stable
    order_by.push(OrderTerm::new(row_key.clone(), true));

    let plan = QueryPlan {
        table: table.clone(),
        row_key,
        show_row_key: settings.show_rowid,
        selectors,
        where_clauses,
        order_by,
        page,
        encoding,
    };
    (plan, report)
}

fn row_key_expr(kind: ObjectKind, settings: &BrowseSettings) -> String {
    match kind {
        ObjectKind::Table => quote_identifier(ROW_KEY_ALIAS),
        // unlocked views key rows by the user-chosen column; locked views
        // have no identity and select NULL in its place
        ObjectKind::View if settings.is_view_editing_unlocked() => {
            quote_identifier(&settings.unlock_view_pk)
        }
        ObjectKind::View => "NULL".to_string(),
    }
}
