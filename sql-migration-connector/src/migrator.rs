//! The data phase (spec §4.7): for each table, page through the source in
//! `RowCount`/`FetchBatch`/`BulkInsert` batches, reset its sequence, and move
//! on. Tables run with up to `data_phase_workers` in flight at once; a
//! constraint-toggle bracket around the whole phase (not per table) lets the
//! bulk inserts land in any order without foreign keys getting in the way.

use crate::flavour::{SourceFlavour, TargetFlavour};
use migration_connector::{CancellationToken, ConnectorError, ConnectorResult};
use sql_schema_describer::TableSchema;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing_futures::Instrument;

/// Runs the data phase over `tables`, already in dependency order (the order
/// doesn't matter for correctness here since foreign keys are disabled for
/// its duration, but keeping it makes worker logs read top-to-bottom).
///
/// Constraint disable/enable is attempted unconditionally around the phase.
/// A failure to disable is only fatal when `continue_on_error` is `false`;
/// either way the phase still runs, since an enforced foreign key rejecting
/// a batch surfaces as an ordinary per-table `BulkInsertFailed`.
pub async fn migrate_data(source: Arc<dyn SourceFlavour>, target: Arc<dyn TargetFlavour>, tables: &[TableSchema], target_schema: &str, batch_size: u32, workers: u32, continue_on_error: bool, cancellation: &CancellationToken) -> ConnectorResult<()> {
    cancellation.check()?;

    if let Err(e) = target.disable_constraints().await {
        tracing::warn!(error = %e, "failed to disable constraints before data phase");
        if !continue_on_error {
            return Err(e);
        }
    }

    let semaphore = Arc::new(Semaphore::new(workers.max(1) as usize));
    let mut handles = Vec::with_capacity(tables.len());

    for table in tables {
        cancellation.check()?;

        let table = table.clone();
        let source = source.clone();
        let target = target.clone();
        let target_schema = target_schema.to_string();
        let cancellation = cancellation.clone();
        let semaphore = semaphore.clone();
        let span = tracing::info_span!("migrate_table", table = %table.qualified_name());

        handles.push(tokio::spawn(
            async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
                migrate_table(&*source, &*target, &table, &target_schema, batch_size, continue_on_error, &cancellation).await
            }
            .instrument(span),
        ));
    }

    let mut first_error = None;
    for handle in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(task_panicked(join_error)),
        };
        if let Err(e) = outcome {
            tracing::error!(error = %e, "table data migration failed");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    if let Err(e) = target.enable_constraints().await {
        tracing::warn!(error = %e, "failed to re-enable constraints after data phase");
        if first_error.is_none() {
            first_error = Some(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn task_panicked(join_error: tokio::task::JoinError) -> ConnectorError {
    ConnectorError::DdlFailed {
        object: "data phase worker".to_string(),
        category: "Data",
        message: format!("table migration task did not complete: {join_error}"),
    }
}

/// Migrates one table's rows in `batch_size`-row pages, stopping as soon as
/// a page comes back short (spec §4.7: "fewer than `batch_size` rows
/// signals the last page," not necessarily zero). Each page is one
/// independent `bulk_insert` call, so a table left half-migrated by a
/// mid-run failure is an acceptable intermediate state (spec §8).
async fn migrate_table(source: &dyn SourceFlavour, target: &dyn TargetFlavour, table: &TableSchema, target_schema: &str, batch_size: u32, continue_on_error: bool, cancellation: &CancellationToken) -> ConnectorResult<()> {
    let row_count = source.row_count(table).await.unwrap_or(-1);
    tracing::info!(table = %table.qualified_name(), row_count, "migrating table data");

    let mut offset: i64 = 0;
    loop {
        cancellation.check()?;

        let batch = source.fetch_batch(table, offset, batch_size).await?;
        let fetched = batch.len();

        if !batch.is_empty() {
            if let Err(e) = target.bulk_insert(target_schema, table, &batch).await {
                tracing::error!(table = %table.qualified_name(), offset, error = %e, "bulk insert failed, batch rolled back");
                if continue_on_error {
                    return Ok(());
                }
                return Err(e);
            }
        }

        offset += fetched as i64;
        if (fetched as u32) < batch_size {
            break;
        }
    }

    if let Err(e) = target.reset_sequences(target_schema, table).await {
        tracing::warn!(table = %table.qualified_name(), error = %e, "failed to reset sequence");
        if !continue_on_error {
            return Err(e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use migration_connector::{Row, RowValue, Vendor};
    use sql_schema_describer::{ColumnSchema, ConstraintSchema, IndexSchema, ViewSchema};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug)]
    struct FakeSource {
        rows: Vec<Row>,
    }

    #[async_trait]
    impl SourceFlavour for FakeSource {
        fn vendor(&self) -> Vendor {
            Vendor::Postgres
        }

        async fn read_tables(&self, _include: &std::collections::HashSet<String>, _exclude: &std::collections::HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
            Ok(vec![])
        }

        async fn read_views(&self) -> ConnectorResult<Vec<ViewSchema>> {
            Ok(vec![])
        }

        async fn row_count(&self, _table: &TableSchema) -> ConnectorResult<i64> {
            Ok(self.rows.len() as i64)
        }

        async fn fetch_batch(&self, _table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>> {
            let start = offset as usize;
            if start >= self.rows.len() {
                return Ok(vec![]);
            }
            let end = (start + batch_size as usize).min(self.rows.len());
            Ok(self.rows[start..end].to_vec())
        }
    }

    #[derive(Debug, Default)]
    struct FakeTarget {
        inserted: StdMutex<Vec<Row>>,
        bulk_insert_calls: AtomicUsize,
        fail_every_batch: bool,
    }

    #[async_trait]
    impl TargetFlavour for FakeTarget {
        fn vendor(&self) -> Vendor {
            Vendor::Postgres
        }

        async fn create_schema(&self, _target_schema: &str, _tables: &[TableSchema], _source: Vendor) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_indexes(&self, _target_schema: &str, _indexes: &[IndexSchema], _source: Vendor, _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_constraints(&self, _target_schema: &str, _constraints: &[ConstraintSchema], _source: Vendor, _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_views(&self, _target_schema: &str, _source_schema: &str, _views: &[ViewSchema], _source: Vendor, _renames: &HashMap<String, String>, _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_foreign_keys(&self, _target_schema: &str, _tables: &[TableSchema], _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn bulk_insert(&self, _target_schema: &str, _table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
            self.bulk_insert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_batch {
                return Err(ConnectorError::BulkInsertFailed {
                    table: "t".to_string(),
                    message: "synthetic failure".to_string(),
                });
            }
            self.inserted.lock().unwrap().extend_from_slice(rows);
            Ok(())
        }

        async fn reset_sequences(&self, _target_schema: &str, _table: &TableSchema) -> ConnectorResult<()> {
            Ok(())
        }

        async fn disable_constraints(&self) -> ConnectorResult<()> {
            Ok(())
        }

        async fn enable_constraints(&self) -> ConnectorResult<()> {
            Ok(())
        }
    }

    fn sample_table() -> TableSchema {
        TableSchema::new("dbo", "users", vec![ColumnSchema::new("id", "int", false)]).primary_key(vec!["id".into()])
    }

    fn row(n: i32) -> Row {
        Row(vec![RowValue::Int32(n)])
    }

    #[tokio::test]
    async fn pages_until_a_short_batch() {
        let source = Arc::new(FakeSource { rows: (0..5).map(row).collect() }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(FakeTarget::default());
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let result = migrate_data(source, target_dyn, &[sample_table()], "public", 2, 1, false, &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert_eq!(target.inserted.lock().unwrap().len(), 5);
        assert_eq!(target.bulk_insert_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn continue_on_error_abandons_the_failing_table_but_succeeds_overall() {
        let source = Arc::new(FakeSource { rows: vec![row(1)] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(FakeTarget { fail_every_batch: true, ..Default::default() });
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let result = migrate_data(source, target_dyn, &[sample_table()], "public", 10, 1, true, &CancellationToken::new()).await;

        assert!(result.is_ok());
        assert!(target.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn aborts_without_continue_on_error() {
        let source = Arc::new(FakeSource { rows: vec![row(1)] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(FakeTarget { fail_every_batch: true, ..Default::default() });
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let result = migrate_data(source, target_dyn, &[sample_table()], "public", 10, 1, false, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ConnectorError::BulkInsertFailed { .. })));
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_starting() {
        let source = Arc::new(FakeSource { rows: vec![row(1)] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(FakeTarget::default()) as Arc<dyn TargetFlavour>;
        let token = CancellationToken::new();
        token.cancel();

        let result = migrate_data(source, target, &[sample_table()], "public", 10, 1, false, &token).await;
        assert!(matches!(result, Err(ConnectorError::Cancelled)));
    }
}
