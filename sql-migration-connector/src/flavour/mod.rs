//! Per-vendor database access (spec §4.5). Each flavour implements the four
//! provider-capability traits from `migration-connector` against its own
//! connection type, plus the dyn-safe [`SourceFlavour`]/[`TargetFlavour`]
//! wrappers the orchestrator dispatches through.
//!
//! Source flavours only ever run against a live connection: describing and
//! reading a source is never something a dry run skips. Target flavours are
//! constructed either live or [`Connection::Collecting`], and every writer
//! method checks which one it got (spec §9, "Dry-run routing").

mod mssql;
mod mysql;
mod oracle_flavour;
mod postgres;
mod quaint_common;

pub use mssql::MssqlFlavour;
pub use mysql::MysqlFlavour;
pub use oracle_flavour::OracleFlavour;
pub use postgres::PostgresFlavour;

use crate::collector::SqlCollector;
use async_trait::async_trait;
use migration_connector::{ConnectorError, ConnectorResult, Row, Vendor};
use sql_schema_describer::{ConstraintSchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Object-safe wrapper around [`migration_connector::SchemaReader`] +
/// [`migration_connector::DataReader`] for a connected source database.
#[async_trait]
pub trait SourceFlavour: Send + Sync + Debug {
    fn vendor(&self) -> Vendor;

    async fn read_tables(&self, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>>;

    async fn read_views(&self) -> ConnectorResult<Vec<ViewSchema>>;

    async fn row_count(&self, table: &TableSchema) -> ConnectorResult<i64>;

    async fn fetch_batch(&self, table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>>;
}

/// Object-safe wrapper around [`migration_connector::SchemaWriter`] +
/// [`migration_connector::DataWriter`] for a target database, live or
/// collecting.
#[async_trait]
pub trait TargetFlavour: Send + Sync + Debug {
    fn vendor(&self) -> Vendor;

    /// `source` carries the originating vendor through so default/check
    /// expressions can be dialect-translated; the flavour itself never
    /// retains cross-run state.
    async fn create_schema(&self, target_schema: &str, tables: &[TableSchema], source: Vendor) -> ConnectorResult<()>;

    /// `continue_on_error` is consulted per object (spec §4.8): a failing
    /// index doesn't stop the remaining indexes in `indexes` from being
    /// attempted, only a fatal error (per [`ConnectorError::is_always_fatal`])
    /// aborts the loop early.
    async fn create_indexes(&self, target_schema: &str, indexes: &[IndexSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()>;

    async fn create_constraints(&self, target_schema: &str, constraints: &[ConstraintSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()>;

    async fn create_views(&self, target_schema: &str, source_schema: &str, views: &[ViewSchema], source: Vendor, renames: &std::collections::HashMap<String, String>, continue_on_error: bool) -> ConnectorResult<()>;

    async fn create_foreign_keys(&self, target_schema: &str, tables: &[TableSchema], continue_on_error: bool) -> ConnectorResult<()>;

    async fn bulk_insert(&self, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()>;

    async fn reset_sequences(&self, target_schema: &str, table: &TableSchema) -> ConnectorResult<()>;

    async fn disable_constraints(&self) -> ConnectorResult<()>;

    async fn enable_constraints(&self) -> ConnectorResult<()>;
}

/// Connects to `vendor` at `connection_string` and returns a live source
/// flavour. Oracle connects synchronously under the hood and is off-loaded
/// to a blocking thread (spec §9: "the Oracle flavour runs its driver calls
/// through `spawn_blocking`").
pub async fn connect_source(vendor: Vendor, connection_string: &str) -> ConnectorResult<Box<dyn SourceFlavour>> {
    match vendor {
        Vendor::Postgres => Ok(Box::new(PostgresFlavour::connect(connection_string).await?)),
        Vendor::MySql => Ok(Box::new(MysqlFlavour::connect(connection_string).await?)),
        Vendor::SqlServer => Ok(Box::new(MssqlFlavour::connect(connection_string).await?)),
        Vendor::Oracle => Ok(Box::new(OracleFlavour::connect(connection_string).await?)),
    }
}

/// Connects a live target flavour, or builds a collecting one that captures
/// into `collector` instead, depending on `dry_run`.
pub async fn build_target(vendor: Vendor, connection_string: &str, dry_run: bool, collector: Arc<SqlCollector>) -> ConnectorResult<Box<dyn TargetFlavour>> {
    if dry_run {
        return Ok(match vendor {
            Vendor::Postgres => Box::new(PostgresFlavour::collecting(collector)),
            Vendor::MySql => Box::new(MysqlFlavour::collecting(collector)),
            Vendor::SqlServer => Box::new(MssqlFlavour::collecting(collector)),
            Vendor::Oracle => Box::new(OracleFlavour::collecting(collector)),
        });
    }

    match vendor {
        Vendor::Postgres => Ok(Box::new(PostgresFlavour::connect(connection_string).await?)),
        Vendor::MySql => Ok(Box::new(MysqlFlavour::connect(connection_string).await?)),
        Vendor::SqlServer => Ok(Box::new(MssqlFlavour::connect(connection_string).await?)),
        Vendor::Oracle => Ok(Box::new(OracleFlavour::connect(connection_string).await?)),
    }
}

pub(crate) fn connection_failed(vendor: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> ConnectorError {
    ConnectorError::ConnectionFailed { vendor, source: Box::new(source) }
}
