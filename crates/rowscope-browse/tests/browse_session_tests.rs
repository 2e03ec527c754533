//! Integration tests for BrowseSession
//!
//! Exercises the open/fetch/close lifecycle, settings persistence across
//! reopen, fetch tickets, and structure-change reconciliation using the
//! MockSource.

mod common;

use std::sync::Arc;

use rowscope_browse::{BrowseError, BrowseSession, ObjectKind};
use rowscope_core::{Column, Page, TableId};

use common::{people_columns, people_source, MockSource};

fn people() -> TableId {
    TableId::in_main("people")
}

// ============ Open / Fetch Tests ============

#[tokio::test]
async fn fetching_a_fresh_table_issues_canonical_sql() {
    let source = people_source();
    let mut session = BrowseSession::new(source.clone() as Arc<dyn rowscope_core::RowSource>);

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    let page = session
        .fetch(Page::first(100))
        .await
        .expect("should fetch first page");

    assert_eq!(page.rows.row_count(), 2);
    assert_eq!(page.total_rows, 2);
    assert!(page.report.is_clean());

    let log = source.query_log();
    assert_eq!(
        log,
        vec![
            r#"SELECT "_rowid_" AS "_rowid_", "id", "name", "age" FROM "main"."people" ORDER BY "_rowid_" ASC LIMIT 100 OFFSET 0"#,
            r#"SELECT COUNT(*) FROM "main"."people""#,
        ]
    );
}

#[tokio::test]
async fn filters_and_sorting_shape_the_fetched_sql() {
    let source = people_source();
    let mut session = BrowseSession::new(source.clone() as Arc<dyn rowscope_core::RowSource>);

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    let settings = session.settings().expect("table is open");
    settings.set_filter(2, ">30");
    settings.toggle_sort(1);

    session
        .fetch(Page::first(100))
        .await
        .expect("should fetch filtered page");

    let log = source.query_log();
    assert_eq!(
        log[0],
        r#"SELECT "_rowid_" AS "_rowid_", "id", "name", "age" FROM "main"."people" WHERE "age" > 30 ORDER BY "name" ASC, "_rowid_" ASC LIMIT 100 OFFSET 0"#
    );
    assert_eq!(
        log[1],
        r#"SELECT COUNT(*) FROM "main"."people" WHERE "age" > 30"#
    );
}

#[tokio::test]
async fn fetch_without_an_open_object_is_an_error() {
    let session = BrowseSession::new(people_source() as Arc<dyn rowscope_core::RowSource>);
    let result = session.fetch(Page::first(10)).await;
    assert!(matches!(result, Err(BrowseError::NoOpenObject)));
}

#[tokio::test]
async fn opening_a_missing_table_surfaces_the_source_error() {
    let mut session = BrowseSession::new(people_source() as Arc<dyn rowscope_core::RowSource>);
    let result = session.open(TableId::in_main("ghosts"), ObjectKind::Table).await;
    assert!(matches!(result, Err(BrowseError::Execution(_))));
}

#[tokio::test]
async fn fetch_failure_surfaces_and_leaves_settings_alone() {
    let source = Arc::new(
        MockSource::new()
            .with_table("people", people_columns())
            .with_failure(),
    );
    let mut session = BrowseSession::new(source as Arc<dyn rowscope_core::RowSource>);
    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    session.settings().expect("table is open").set_filter(2, ">30");

    let result = session.fetch(Page::first(10)).await;
    assert!(matches!(result, Err(BrowseError::Execution(_))));

    // the failed fetch must not have touched the stored settings
    let settings = session.store().get(&people()).expect("record exists");
    assert_eq!(settings.filters.get(&2).map(String::as_str), Some(">30"));
}

#[tokio::test]
async fn count_failure_degrades_to_a_floor_total() {
    let source = Arc::new(
        MockSource::new()
            .with_table("people", people_columns())
            .with_rows(common::people_rows())
            .with_count_failure(),
    );
    let mut session = BrowseSession::new(source as Arc<dyn rowscope_core::RowSource>);
    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");

    let page = session
        .fetch(Page::new(10, 40))
        .await
        .expect("fetch should survive a count failure");
    // offset plus fetched rows is the best total we can report
    assert_eq!(page.total_rows, 42);
}

#[tokio::test]
async fn broken_filters_downgrade_with_a_report() {
    let source = people_source();
    let mut session = BrowseSession::new(source.clone() as Arc<dyn rowscope_core::RowSource>);
    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    session.settings().expect("table is open").set_filter(2, ">");

    let page = session
        .fetch(Page::first(10))
        .await
        .expect("should fetch despite the broken filter");

    assert_eq!(page.report.skipped.len(), 1);
    assert_eq!(page.report.skipped[0].column, Some(2));
    // the broken filter stayed out of the WHERE clause
    assert!(
        !source.query_log()[0].contains("WHERE"),
        "broken filter leaked into SQL: {}",
        source.query_log()[0]
    );
    // and the raw text is still stored for the user to fix
    let settings = session.store().get(&people()).expect("record exists");
    assert_eq!(settings.filters.get(&2).map(String::as_str), Some(">"));
}

// ============ Settings Lifetime Tests ============

#[tokio::test]
async fn settings_survive_close_and_reopen() {
    let mut session = BrowseSession::new(people_source() as Arc<dyn rowscope_core::RowSource>);

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    let settings = session.settings().expect("table is open");
    settings.set_filter(2, ">30");
    settings.set_column_width(1, 220);
    settings.set_show_rowid(true);

    session.close();
    assert!(session.current().is_none());

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should reopen table");
    let settings = session.settings().expect("table is open");
    assert_eq!(settings.filters.get(&2).map(String::as_str), Some(">30"));
    assert_eq!(settings.column_widths.get(&1), Some(&220));
    assert!(settings.show_rowid);
}

#[tokio::test]
async fn each_table_keeps_its_own_settings() {
    let source = Arc::new(
        MockSource::new()
            .with_table("people", people_columns())
            .with_table("orders", vec![Column::new("id", "INTEGER")]),
    );
    let mut session = BrowseSession::new(source as Arc<dyn rowscope_core::RowSource>);

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open people");
    session.settings().expect("open").set_filter(1, "alice");

    session
        .open(TableId::in_main("orders"), ObjectKind::Table)
        .await
        .expect("should open orders");
    assert!(session.settings().expect("open").filters.is_empty());

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should switch back");
    assert_eq!(
        session.settings().expect("open").filters.get(&1).map(String::as_str),
        Some("alice")
    );
}

// ============ Ticket / Cancellation Tests ============

#[tokio::test]
async fn switching_objects_invalidates_tickets_and_cancels() {
    let source = Arc::new(
        MockSource::new()
            .with_table("people", people_columns())
            .with_table("orders", vec![Column::new("id", "INTEGER")]),
    );
    let mut session = BrowseSession::new(source.clone() as Arc<dyn rowscope_core::RowSource>);

    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open people");
    let ticket = session.ticket();
    assert!(session.is_current(ticket));

    session
        .open(TableId::in_main("orders"), ObjectKind::Table)
        .await
        .expect("should open orders");
    assert!(!session.is_current(ticket), "old ticket must go stale");
    assert!(source.cancel_count() >= 1, "switching must pull the cancel handle");

    let ticket = session.ticket();
    session.close();
    assert!(!session.is_current(ticket), "close must invalidate tickets");
}

// ============ Structure Change Tests ============

#[tokio::test]
async fn structure_change_rebinds_settings_of_the_open_object() {
    let mut session = BrowseSession::new(people_source() as Arc<dyn rowscope_core::RowSource>);
    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    session.settings().expect("open").set_filter(2, ">30");

    // age moves to the front of the table
    let new_columns = vec![
        Column::new("age", "INTEGER"),
        Column::new("id", "INTEGER"),
        Column::new("name", "TEXT"),
    ];
    session.structure_changed(&people(), None, &new_columns);

    let open = session.current().expect("still open");
    assert_eq!(open.columns[0].name, "age");

    let (plan, report) = session.compile(Page::first(10)).expect("should compile");
    assert!(report.is_clean());
    assert!(
        plan.to_sql().contains(r#"WHERE "age" > 30"#),
        "filter should follow the moved column: {}",
        plan.to_sql()
    );
}

#[tokio::test]
async fn structure_change_drops_settings_of_removed_columns() {
    let mut session = BrowseSession::new(people_source() as Arc<dyn rowscope_core::RowSource>);
    session
        .open(people(), ObjectKind::Table)
        .await
        .expect("should open table");
    let settings = session.settings().expect("open");
    settings.set_filter(2, ">30");
    settings.toggle_sort(2);

    let new_columns = vec![Column::new("id", "INTEGER"), Column::new("name", "TEXT")];
    session.structure_changed(&people(), None, &new_columns);

    let settings = session.store().get(&people()).expect("record exists");
    assert!(settings.filters.is_empty());
    assert!(settings.sort.is_empty());
}

// ============ View Tests ============

#[tokio::test]
async fn views_browse_with_and_without_an_unlock_column() {
    let source = Arc::new(
        MockSource::new().with_table("adults", people_columns()),
    );
    let mut session = BrowseSession::new(source.clone() as Arc<dyn rowscope_core::RowSource>);
    session
        .open(TableId::in_main("adults"), ObjectKind::View)
        .await
        .expect("should open view");

    let (plan, _) = session.compile(Page::first(10)).expect("should compile");
    assert!(plan.to_sql().starts_with(r#"SELECT NULL AS "_rowid_""#));

    session
        .settings()
        .expect("open")
        .unlock_view_editing("id");
    let (plan, _) = session.compile(Page::first(10)).expect("should compile");
    assert!(plan.to_sql().starts_with(r#"SELECT "id" AS "_rowid_""#));
}
