//! Rowscope Core - shared types for the table-browsing engine
//!
//! This crate provides the fundamental types that the other Rowscope crates
//! depend on. It defines:
//!
//! - `Value`, `Row`, `RowSet` - typed cell data crossing the engine boundary
//! - `Column`, `Affinity` - live structure snapshots and SQLite type affinity
//! - `TableId` - stable (schema, name) identity for browsable objects
//! - `QueryPlan` - the compiled representation of one browse request
//! - `RowSource` - the async engine boundary that executes plans

mod column;
mod error;
mod plan;
mod quote;
mod source;
mod table_id;
mod types;

pub use column::*;
pub use error::*;
pub use plan::*;
pub use quote::*;
pub use source::*;
pub use table_id::*;
pub use types::*;
