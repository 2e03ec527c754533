//! Rowscope Browse
//!
//! Per-table browsing state and query construction. This crate remembers
//! how a user last looked at every table (sort, filters, hidden columns,
//! formats, encoding), compiles that state into deterministic SQL, and
//! evaluates conditional formats against fetched values.
//!
//! # Architecture
//!
//! ```text
//! BrowseSession          open/close, fetch pages, invalidate tickets
//!     ↓
//! SettingsStore          per-table BrowseSettings, structure reconciliation
//!     ↓
//! build_query            settings + live columns → QueryPlan + FilterReport
//!     ↓
//! RowSource              engine boundary (rowscope-core)
//! ```
//!
//! Filters degrade, never fail: a filter that cannot compile is skipped and
//! reported, and the rest of the query still runs. Settings keyed by column
//! ordinal are rebound by name or position when a table's structure changes.

mod cond_format;
mod display;
mod error;
mod filter;
mod query;
mod session;
mod settings;
mod store;

pub use cond_format::{
    move_rule_down, move_rule_up, remove_rule, style_for, Alignment, CellStyle, FormatRule,
    FormatTarget, FORMAT_PALETTE,
};
pub use display::DisplayFormat;
pub use error::{BrowseError, BrowseResult};
pub use filter::{
    compile_filters, CompareOp, FilterContext, FilterExpr, FilterParseError, FilterReport,
    SkippedFilter,
};
pub use query::{build_query, ObjectKind};
pub use session::{BrowsePage, BrowseSession, FetchTicket, OpenObject};
pub use settings::{
    BrowseSettings, PlotAxes, PlotStyle, SortColumn, SortOrder, DEFAULT_ROW_KEY,
};
pub use store::SettingsStore;
