//! Engine boundary for executing browse plans

use async_trait::async_trait;
use std::sync::Arc;

use crate::{Column, QueryPlan, Result, RowSet, TableId};

/// Handle for cancelling a running fetch from any thread.
///
/// Safe to call from any thread and idempotent; cancelling when nothing is
/// running is a no-op.
pub trait FetchCancelHandle: Send + Sync {
    /// Interrupt the currently running query on the associated source
    fn cancel(&self);
}

/// A source of rows for the browse grid.
///
/// Implementations execute compiled [`QueryPlan`]s and report the live
/// structure of browsable objects. Execution failures surface as error
/// values; callers fall back to an empty result set.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Execute a plan and return one page of rows
    async fn fetch(&self, plan: &QueryPlan) -> Result<RowSet>;

    /// Execute the plan's COUNT companion and return the matching row count
    async fn count(&self, plan: &QueryPlan) -> Result<u64>;

    /// Live column list of a table or view
    async fn object_columns(&self, table: &TableId) -> Result<Vec<Column>>;

    /// Get a handle that can be used to cancel running fetches.
    ///
    /// Returns `None` if the source does not support cancellation.
    fn cancel_handle(&self) -> Option<Arc<dyn FetchCancelHandle>> {
        None
    }
}
