//! Common test utilities and mocks

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rowscope_core::{
    Column, FetchCancelHandle, QueryPlan, Result, Row, RowSet, RowSource, RowscopeError, TableId,
    Value,
};

/// Cancellation handle that only counts how often it was pulled
#[derive(Default)]
pub struct MockCancelHandle {
    cancel_count: parking_lot::Mutex<usize>,
}

impl FetchCancelHandle for MockCancelHandle {
    fn cancel(&self) {
        *self.cancel_count.lock() += 1;
    }
}

/// Mock row source for exercising session logic without a database.
///
/// Column lists are registered per table. Fetches return a canned row set
/// and log the SQL each plan renders to, for assertion in tests.
pub struct MockSource {
    pub columns: BTreeMap<TableId, Vec<Column>>,
    pub rows: RowSet,
    pub total: u64,
    pub should_fail: bool,
    pub count_fails: bool,
    /// Log of all SQL the session asked this source to run
    pub query_log: Arc<parking_lot::Mutex<Vec<String>>>,
    cancel: Arc<MockCancelHandle>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            columns: BTreeMap::new(),
            rows: RowSet::empty(),
            total: 0,
            should_fail: false,
            count_fails: false,
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            cancel: Arc::new(MockCancelHandle::default()),
        }
    }

    pub fn with_table(mut self, name: &str, columns: Vec<Column>) -> Self {
        self.columns.insert(TableId::in_main(name), columns);
        self
    }

    pub fn with_rows(mut self, rows: RowSet) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Fail only the COUNT companion query
    pub fn with_count_failure(mut self) -> Self {
        self.count_fails = true;
        self
    }

    pub fn query_log(&self) -> Vec<String> {
        self.query_log.lock().clone()
    }

    pub fn cancel_count(&self) -> usize {
        *self.cancel.cancel_count.lock()
    }
}

#[async_trait]
impl RowSource for MockSource {
    async fn fetch(&self, plan: &QueryPlan) -> Result<RowSet> {
        self.query_log.lock().push(plan.to_sql());
        if self.should_fail {
            return Err(RowscopeError::Query("fetch failed".into()));
        }
        Ok(self.rows.clone())
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64> {
        self.query_log.lock().push(plan.count_sql());
        if self.should_fail || self.count_fails {
            return Err(RowscopeError::Query("count failed".into()));
        }
        Ok(self.total)
    }

    async fn object_columns(&self, table: &TableId) -> Result<Vec<Column>> {
        self.columns
            .get(table)
            .cloned()
            .ok_or_else(|| RowscopeError::NotFound(format!("no such table: {table}")))
    }

    fn cancel_handle(&self) -> Option<Arc<dyn FetchCancelHandle>> {
        let handle: Arc<dyn FetchCancelHandle> = self.cancel.clone();
        Some(handle)
    }
}

pub fn people_columns() -> Vec<Column> {
    vec![
        Column::new("id", "INTEGER"),
        Column::new("name", "TEXT"),
        Column::new("age", "INTEGER"),
    ]
}

pub fn people_rows() -> RowSet {
    RowSet {
        columns: people_columns(),
        rows: vec![
            Row::new(
                Value::Integer(1),
                vec![
                    Value::Integer(1),
                    Value::Text("Alice".to_string()),
                    Value::Integer(34),
                ],
            ),
            Row::new(
                Value::Integer(2),
                vec![
                    Value::Integer(2),
                    Value::Text("Bob".to_string()),
                    Value::Integer(41),
                ],
            ),
        ],
        execution_time_ms: 1,
    }
}

/// Source with a `people` table and two canned rows
pub fn people_source() -> Arc<MockSource> {
    Arc::new(
        MockSource::new()
            .with_table("people", people_columns())
            .with_rows(people_rows())
            .with_total(2),
    )
}
