//! Browse session orchestration
//!
//! A [`BrowseSession`] owns the settings store for one database session,
//! tracks which table or view is on screen, compiles its settings into
//! query plans and runs them through a [`RowSource`]. Fetching never
//! mutates settings, so an abandoned fetch leaves no trace.

use std::sync::Arc;

use rowscope_core::{Column, Page, QueryPlan, RowSet, RowSource, TableId};

use crate::error::{BrowseError, BrowseResult};
use crate::filter::FilterReport;
use crate::query::{build_query, ObjectKind};
use crate::settings::BrowseSettings;
use crate::store::SettingsStore;

/// The table or view currently on screen
#[derive(Debug, Clone)]
pub struct OpenObject {
    pub table: TableId,
    pub kind: ObjectKind,
    /// Live column snapshot the settings ordinals are valid against
    pub columns: Vec<Column>,
}

/// One fetched page plus everything the grid needs to render it
#[derive(Debug)]
pub struct BrowsePage {
    /// The plan that produced this page
    pub plan: QueryPlan,
    /// Filters that had to be skipped while compiling the plan
    pub report: FilterReport,
    pub rows: RowSet,
    /// Total rows matching the plan's filters, across all pages
    pub total_rows: u64,
}

/// Token identifying one fetch attempt. Opening or closing an object
/// invalidates outstanding tickets; completions carrying a stale ticket
/// must be discarded by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
}

pub struct BrowseSession {
    source: Arc<dyn RowSource>,
    store: SettingsStore,
    current: Option<OpenObject>,
    fetch_epoch: u64,
}

impl BrowseSession {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self::with_store(source, SettingsStore::new())
    }

    /// Resume with settings restored from a project file
    pub fn with_store(source: Arc<dyn RowSource>, store: SettingsStore) -> Self {
        Self {
            source,
            store,
            current: None,
            fetch_epoch: 0,
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    pub fn current(&self) -> Option<&OpenObject> {
        self.current.as_ref()
    }

    /// Open an object for browsing. Any in-flight fetch is cancelled and its
    /// ticket invalidated; the object's settings record is created when it
    /// does not exist yet.
    #[tracing::instrument(skip(self))]
    pub async fn open(&mut self, table: TableId, kind: ObjectKind) -> BrowseResult<()> {
        let columns = self.source.object_columns(&table).await?;
        self.cancel_in_flight();
        tracing::debug!(table = %table, column_count = columns.len(), "opening object for browsing");
        self.store.settings(&table);
        self.current = Some(OpenObject {
            table,
            kind,
            columns,
        });
        Ok(())
    }

    /// Close the browser. Settings survive in the store for the next open.
    pub fn close(&mut self) {
        self.cancel_in_flight();
        self.current = None;
    }

    fn cancel_in_flight(&mut self) {
        self.fetch_epoch += 1;
        if let Some(handle) = self.source.cancel_handle() {
            handle.cancel();
        }
    }

    /// Ticket for the next fetch
    pub fn ticket(&self) -> FetchTicket {
        FetchTicket {
            epoch: self.fetch_epoch,
        }
    }

    /// Whether a completion for `ticket` may still be applied
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.epoch == self.fetch_epoch
    }

    /// Settings of the open object
    pub fn settings(&mut self) -> BrowseResult<&mut BrowseSettings> {
        let table = self
            .current
            .as_ref()
            .ok_or(BrowseError::NoOpenObject)?
            .table
            .clone();
        Ok(self.store.settings(&table))
    }

    /// Compile the open object's settings into a plan without executing it
    pub fn compile(&self, page: Page) -> BrowseResult<(QueryPlan, FilterReport)> {
        let open = self.current.as_ref().ok_or(BrowseError::NoOpenObject)?;
        let default = BrowseSettings::default();
        let settings = self.store.get(&open.table).unwrap_or(&default);
        let encoding = self.store.encoding_for(&open.table);
        Ok(build_query(
            &open.table,
            open.kind,
            settings,
            &open.columns,
            page,
            encoding,
        ))
    }

    /// Fetch one page of the open object: the plan's SELECT plus its COUNT
    /// companion for the pagination total.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, page: Page) -> BrowseResult<BrowsePage> {
        let (plan, report) = self.compile(page)?;
        tracing::debug!("Browsing with SQL: {}", plan.to_sql());

        let rows = self.source.fetch(&plan).await?;
        let total_rows = match self.source.count(&plan).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!("COUNT(*) query failed, pagination total unavailable: {}", e);
                plan.page.offset + rows.row_count() as u64
            }
        };
        tracing::info!(
            table = %plan.table,
            row_count = rows.row_count(),
            total_rows,
            execution_time_ms = rows.execution_time_ms,
            "page fetched"
        );

        Ok(BrowsePage {
            plan,
            report,
            rows,
            total_rows,
        })
    }

    /// Apply a structure-change notification for any table.
    ///
    /// `old_names` is the column list the stored settings were written
    /// against; when it is `None` and `table` is the open object, the live
    /// snapshot supplies it. The open object's snapshot is replaced.
    pub fn structure_changed(
        &mut self,
        table: &TableId,
        old_names: Option<&[String]>,
        new_columns: &[Column],
    ) {
        let snapshot_names: Option<Vec<String>> = match (&self.current, old_names) {
            (Some(open), None) if &open.table == table => {
                Some(open.columns.iter().map(|c| c.name.clone()).collect())
            }
            _ => None,
        };
        let old = old_names.or(snapshot_names.as_deref());
        let new_names: Vec<String> = new_columns.iter().map(|c| c.name.clone()).collect();
        self.store.apply_structure_change(table, old, &new_names);

        if let Some(open) = self.current.as_mut() {
            if &open.table == table {
                open.columns = new_columns.to_vec();
            }
        }
    }
}

impl std::fmt::Debug for BrowseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowseSession")
            .field("current", &self.current)
            .field("fetch_epoch", &self.fetch_epoch)
            .finish_non_exhaustive()
    }
}
