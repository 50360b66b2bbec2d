//! Store adapters: the capability set the core needs from a backend.
//!
//! One operation per call; the core never retries and never spans calls in a
//! transaction. Adapters report failures as [`StoreError`] only.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::ResolvedTable;
use crate::error::StoreError;
use crate::filter::{Column, Predicate};
use crate::request::Direction;
use async_trait::async_trait;
use std::sync::Arc;

/// Flat field → value record.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A fully validated read: every column is known, order columns are projected.
#[derive(Clone, Debug)]
pub struct SelectOp {
    pub table: Arc<ResolvedTable>,
    pub columns: Vec<Column>,
    pub predicate: Option<Predicate>,
    pub order: Vec<(Column, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Rows with exactly the projected columns, in order.
    async fn select(&self, op: &SelectOp) -> Result<Vec<Row>, StoreError>;

    async fn insert(&self, table: &ResolvedTable, record: &Row) -> Result<(), StoreError>;

    /// Returns the number of rows changed.
    async fn update(&self, table: &ResolvedTable, predicate: &Predicate, changes: &Row) -> Result<u64, StoreError>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: &ResolvedTable, predicate: &Predicate) -> Result<u64, StoreError>;

    /// Liveness check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
