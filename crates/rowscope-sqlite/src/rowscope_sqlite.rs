//! SQLite row source
//!
//! Executes query plans against a SQLite database through rusqlite. One
//! source serves one browsing surface; queries run under a mutex and can be
//! interrupted from any thread through the cancel handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, InterruptHandle, OpenFlags};

use rowscope_core::{
    quote_identifier, quote_string, Column, FetchCancelHandle, QueryPlan, Result, Row, RowSet,
    RowSource, RowscopeError, TableId, Value,
};

/// Cancel handle for SQLite queries.
///
/// Wraps the rusqlite `InterruptHandle` and can be called from any thread to
/// interrupt a running query. The interrupted query fails with
/// SQLITE_INTERRUPT, which surfaces as [`RowscopeError::Cancelled`].
pub struct SqliteCancelHandle {
    interrupt_handle: Arc<InterruptHandle>,
}

impl FetchCancelHandle for SqliteCancelHandle {
    fn cancel(&self) {
        tracing::debug!("Interrupting SQLite query");
        self.interrupt_handle.interrupt();
    }
}

/// SQLite-backed row source
pub struct SqliteSource {
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: Arc<InterruptHandle>,
}

impl SqliteSource {
    /// Open a SQLite database for browsing
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                RowscopeError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            RusqliteConnection::open_with_flags(path, flags).map_err(|e| {
                RowscopeError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    path, e
                ))
            })?
        };

        Self::finish_open(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Open without write access, for browsing databases that must not change
    pub fn open_read_only(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database read-only");
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = RusqliteConnection::open_with_flags(path, flags).map_err(|e| {
            RowscopeError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                path, e
            ))
        })?;

        Self::finish_open(conn)
    }

    fn finish_open(conn: RusqliteConnection) -> Result<Self> {
        // PRAGMA commands return results, so use pragma_update
        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            RowscopeError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        // the interrupt handle has to be taken before the connection moves
        // into the mutex; it stays valid from any thread afterwards
        let interrupt_handle = Arc::new(conn.get_interrupt_handle());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt_handle,
        })
    }

    /// Run multiple SQL statements, as schema setup scripts do
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .map_err(|e| RowscopeError::Query(format!("Failed to execute batch: {}", e)))
    }

    /// Materialize the plan's filtered, sorted data as a database view
    pub fn create_view(&self, plan: &QueryPlan, view_name: &str) -> Result<()> {
        let sql = plan.create_view_sql(view_name);
        tracing::debug!(view = %view_name, "creating view from browse state");
        let conn = self.conn.lock();
        conn.execute_batch(&sql)
            .map_err(|e| map_query_error("Failed to create view", e))
    }

    fn run_select(
        &self,
        sql: &str,
        encoding: Option<&str>,
    ) -> Result<(Vec<Column>, Vec<Vec<Value>>, u64)> {
        let start_time = std::time::Instant::now();
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| map_query_error("Failed to prepare query", e))?;

        // declared types come from the schema via sqlite3_column_decltype;
        // computed columns have none and stay DYNAMIC
        let columns: Vec<Column> = stmt
            .columns()
            .iter()
            .map(|col| Column::new(col.name(), col.decl_type().unwrap_or("DYNAMIC")))
            .collect();

        let mut rows = Vec::new();
        let mut query_rows = stmt
            .query([])
            .map_err(|e| map_query_error("Failed to execute query", e))?;

        while let Some(row) = query_rows
            .next()
            .map_err(|e| map_query_error("Failed to fetch row", e))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(read_value(row, i, encoding)?);
            }
            rows.push(values);
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );
        Ok((columns, rows, execution_time_ms))
    }
}

#[async_trait]
impl RowSource for SqliteSource {
    #[tracing::instrument(skip(self, plan), fields(table = %plan.table))]
    async fn fetch(&self, plan: &QueryPlan) -> Result<RowSet> {
        let sql = plan.to_sql();
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "fetching page");

        let (mut columns, raw_rows, execution_time_ms) =
            self.run_select(&sql, plan.encoding.as_deref())?;

        // the first selected column is always the row identity; peel it off
        // so callers see only the visible projection
        if columns.is_empty() {
            return Err(RowscopeError::Query("Plan selected no columns".into()));
        }
        columns.remove(0);
        let rows = raw_rows
            .into_iter()
            .map(|mut values| {
                let key = if values.is_empty() {
                    Value::Null
                } else {
                    values.remove(0)
                };
                Row::new(key, values)
            })
            .collect();

        Ok(RowSet {
            columns,
            rows,
            execution_time_ms,
        })
    }

    #[tracing::instrument(skip(self, plan), fields(table = %plan.table))]
    async fn count(&self, plan: &QueryPlan) -> Result<u64> {
        let sql = plan.count_sql();
        let conn = self.conn.lock();
        let total: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| map_query_error("Failed to count rows", e))?;
        Ok(total.max(0) as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn object_columns(&self, table: &TableId) -> Result<Vec<Column>> {
        tracing::trace!(table = %table, "fetching column information");
        let sql = format!(
            "PRAGMA {}.table_info({})",
            quote_identifier(&table.schema),
            quote_string(&table.name)
        );

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| map_query_error("Failed to read table structure", e))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| map_query_error("Failed to read table structure", e))?;

        let mut columns = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| map_query_error("Failed to read table structure", e))?
        {
            let name: String = row
                .get(1)
                .map_err(|e| RowscopeError::Query(e.to_string()))?;
            let decl_type: String = row
                .get(2)
                .map_err(|e| RowscopeError::Query(e.to_string()))?;
            columns.push(Column::new(name, decl_type));
        }

        if columns.is_empty() {
            return Err(RowscopeError::NotFound(format!("no such table: {}", table)));
        }
        Ok(columns)
    }

    fn cancel_handle(&self) -> Option<Arc<dyn FetchCancelHandle>> {
        Some(Arc::new(SqliteCancelHandle {
            interrupt_handle: self.interrupt_handle.clone(),
        }))
    }
}

fn map_query_error(context: &str, e: rusqlite::Error) -> RowscopeError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::OperationInterrupted {
            return RowscopeError::Cancelled;
        }
    }
    RowscopeError::Query(format!("{}: {}", context, e))
}

/// Convert one cell to a Value, decoding text under the plan's encoding
fn read_value(row: &rusqlite::Row, idx: usize, encoding: Option<&str>) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| RowscopeError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(decode_text(bytes, encoding)),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    };

    Ok(value)
}

/// Decode text bytes under a named encoding. UTF-8 is the default; Latin-1
/// maps each byte straight to its code point; unknown names fall back to
/// lossy UTF-8 with a warning.
fn decode_text(bytes: &[u8], encoding: Option<&str>) -> String {
    match encoding {
        None => String::from_utf8_lossy(bytes).to_string(),
        Some(name) if name.eq_ignore_ascii_case("UTF-8") || name.eq_ignore_ascii_case("UTF8") => {
            String::from_utf8_lossy(bytes).to_string()
        }
        Some(name)
            if name.eq_ignore_ascii_case("Latin-1") || name.eq_ignore_ascii_case("ISO-8859-1") =>
        {
            bytes.iter().map(|&b| b as char).collect()
        }
        Some(other) => {
            tracing::warn!(encoding = %other, "unsupported encoding, decoding as UTF-8");
            String::from_utf8_lossy(bytes).to_string()
        }
    }
}
