use crate::{ConnectorResult, Row, Vendor};
use async_trait::async_trait;
use sql_schema_describer::{ConstraintSchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::{HashMap, HashSet};

/// Reads structural metadata from a vendor's catalog (spec §4.5).
///
/// `Connection` is an associated type rather than a fixed concrete type so
/// that each vendor flavour can plug in its own connection wrapper without
/// this crate depending on any vendor driver.
#[async_trait]
pub trait SchemaReader {
    type Connection: Send + Sync;

    /// Include/exclude match on unqualified table names, case-insensitive.
    /// System schemas are always excluded.
    async fn read_tables(&self, conn: &Self::Connection, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>>;

    async fn read_views(&self, conn: &Self::Connection) -> ConnectorResult<Vec<ViewSchema>>;
}

/// Reads row data from a vendor in deterministic, pageable batches.
#[async_trait]
pub trait DataReader {
    type Connection: Send + Sync;

    async fn row_count(&self, conn: &Self::Connection, table: &TableSchema) -> ConnectorResult<i64>;

    /// Ordered by the table's primary key if present, else its first
    /// column, else a vendor-valid stable expression (spec §4.5). Returns
    /// fewer than `batch_size` rows only on the final page.
    async fn fetch_batch(&self, conn: &Self::Connection, table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>>;
}

/// Creates target-side structures (spec §4.5). `create_schema` defers
/// foreign keys; they are applied later via [`SchemaWriter::create_foreign_keys`]
/// so tables involved in dependency cycles can still be created.
#[async_trait]
pub trait SchemaWriter {
    type Connection: Send + Sync;

    async fn create_schema(&self, conn: &Self::Connection, target_schema: &str, tables: &[TableSchema]) -> ConnectorResult<()>;

    async fn create_indexes(&self, conn: &Self::Connection, target_schema: &str, indexes: &[IndexSchema]) -> ConnectorResult<()>;

    async fn create_constraints(&self, conn: &Self::Connection, target_schema: &str, constraints: &[ConstraintSchema]) -> ConnectorResult<()>;

    async fn create_views(&self, conn: &Self::Connection, target_schema: &str, views: &[ViewSchema], source_tables: Option<&[TableSchema]>) -> ConnectorResult<()>;

    async fn create_foreign_keys(&self, conn: &Self::Connection, target_schema: &str, tables: &[TableSchema]) -> ConnectorResult<()>;
}

/// Writes row data and manages the target-side mechanics around it (spec
/// §4.5 / §4.7): sequence resets and the constraint-toggle bracket around
/// the whole data phase.
#[async_trait]
pub trait DataWriter {
    type Connection: Send + Sync;

    async fn bulk_insert(&self, conn: &Self::Connection, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()>;

    async fn reset_sequences(&self, conn: &Self::Connection, target_schema: &str, table: &TableSchema) -> ConnectorResult<()>;

    async fn disable_constraints(&self, conn: &Self::Connection) -> ConnectorResult<()>;

    async fn enable_constraints(&self, conn: &Self::Connection) -> ConnectorResult<()>;
}
