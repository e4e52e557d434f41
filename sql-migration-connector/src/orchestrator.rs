//! Drives one migration run through its seven phases in the fixed order
//! spec §4.8 requires: schema, data, indexes, constraints, views, then
//! foreign keys last so that tables forming a dependency cycle have already
//! been created by the time their cross-references are wired up.

use crate::collector::SqlCollector;
use crate::flavour::{SourceFlavour, TargetFlavour};
use crate::identifier;
use crate::schema_rename;
use crate::sorter;
use migration_connector::{CancellationToken, ConnectorError, ConnectorResult, MigrationRequest};
use std::sync::Arc;

/// `NotStarted -> Running -> Succeeded | Failed | Cancelled` (spec §7). The
/// orchestrator only ever observes its own transitions; nothing external
/// reaches into this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// Runs every enabled phase of `request` against already-connected
/// `source`/`target` flavours. `collector` is `Some` only in dry-run mode;
/// its presence, not a separate flag, is what decides whether phase headers
/// get emitted (spec §9).
#[tracing::instrument(skip(source, target, collector, cancellation), fields(source = %request.source_vendor.as_str(), target = %request.target_vendor.as_str()))]
pub async fn run(request: &MigrationRequest, source: Arc<dyn SourceFlavour>, target: Arc<dyn TargetFlavour>, collector: Option<Arc<SqlCollector>>, cancellation: &CancellationToken) -> ConnectorResult<RunState> {
    tracing::info!("migration run starting");

    match run_phases(request, source, target, collector, cancellation).await {
        Ok(()) => {
            tracing::info!("migration run succeeded");
            Ok(RunState::Succeeded)
        }
        Err(ConnectorError::Cancelled) => {
            // Surfaced to the caller as `Err` (spec §7: "cancellation is
            // surfaced as Cancelled"), not swallowed into a state value —
            // `RunState::Cancelled` documents the state machine, it is
            // never actually returned inside `Ok`.
            tracing::warn!("migration run cancelled");
            Err(ConnectorError::Cancelled)
        }
        Err(e) => {
            tracing::error!(error = %e, "migration run failed");
            Err(e)
        }
    }
}

async fn run_phases(request: &MigrationRequest, source: Arc<dyn SourceFlavour>, target: Arc<dyn TargetFlavour>, collector: Option<Arc<SqlCollector>>, cancellation: &CancellationToken) -> ConnectorResult<()> {
    let emit_comments = request.dry_run.emit_comments;
    let phase_header = |name: &str| {
        if let Some(collector) = &collector {
            collector.emit_phase_header(name, emit_comments);
        }
    };

    cancellation.check()?;
    phase_header("Schema");
    let source_tables = source.read_tables(&request.include_tables, &request.exclude_tables).await?;
    let sorted = sorter::sort(source_tables);
    let max_len = request.effective_max_identifier_length();
    let converted = schema_rename::convert_tables(sorted.tables, request.target_vendor, request.naming_convention, max_len)?;
    let tables = converted.tables;
    let mut renames = converted.renames;

    let source_views = if request.phases.migrate_views { source.read_views().await? } else { Vec::new() };

    cancellation.check()?;
    if request.phases.migrate_schema {
        tracing::info!(tables = tables.len(), "creating target tables");
        target.create_schema(&request.target_schema, &tables, request.source_vendor).await?;
    }

    cancellation.check()?;
    if request.phases.migrate_data {
        phase_header("Data");
        if request.dry_run.enabled {
            if request.dry_run.sample_row_count > 0 {
                tracing::info!(sample_row_count = request.dry_run.sample_row_count, "capturing sample INSERTs for dry run");
                sample_data(&*source, &*target, &tables, &request.target_schema, request.dry_run.sample_row_count, cancellation).await?;
            }
        } else {
            tracing::info!("starting data phase");
            crate::migrator::migrate_data(source.clone(), target.clone(), &tables, &request.target_schema, request.batch_size, request.data_phase_workers, request.continue_on_error, cancellation).await?;
        }
    }

    cancellation.check()?;
    if request.phases.migrate_indexes {
        phase_header("Indexes");
        let indexes: Vec<_> = tables.iter().flat_map(|t| t.indexes.iter().filter(|i| i.is_creatable()).cloned()).collect();
        tracing::info!(indexes = indexes.len(), "creating indexes");
        target.create_indexes(&request.target_schema, &indexes, request.source_vendor, request.continue_on_error).await?;
    }

    cancellation.check()?;
    if request.phases.migrate_constraints {
        phase_header("Constraints");
        let constraints: Vec<_> = tables.iter().flat_map(|t| t.constraints.iter().cloned()).collect();
        tracing::info!(constraints = constraints.len(), "creating non-key constraints");
        target.create_constraints(&request.target_schema, &constraints, request.source_vendor, request.continue_on_error).await?;
    }

    cancellation.check()?;
    if request.phases.migrate_views {
        phase_header("Views");
        for view in &source_views {
            let converted_name = identifier::convert(&view.name, request.target_vendor, request.naming_convention, max_len)?;
            renames.insert(view.name.clone(), converted_name);
        }
        // A run targets one source schema; every table (and so every view
        // selecting from one) shares it, since `schema_rename` never
        // rewrites `TableSchema::schema` itself.
        let source_schema = tables.first().map(|t| t.schema.as_str()).or_else(|| source_views.first().map(|v| v.schema.as_str())).unwrap_or(&request.target_schema);
        tracing::info!(views = source_views.len(), "creating views");
        target.create_views(&request.target_schema, source_schema, &source_views, request.source_vendor, &renames, request.continue_on_error).await?;
    }

    cancellation.check()?;
    if request.phases.migrate_foreign_keys {
        phase_header("ForeignKeys");
        tracing::info!(tables = tables.len(), deferred = sorted.deferred_foreign_keys.len(), "creating foreign keys");
        target.create_foreign_keys(&request.target_schema, &tables, request.continue_on_error).await?;
    }

    Ok(())
}

/// Captures up to `sample_row_count` literal `INSERT` statements per table
/// for a dry-run script, instead of paging through the full table (spec
/// §6: "Optional sample INSERTs ... with up to `SampleRowCount` rows per
/// table"). The real data phase never runs during a dry run; this is the
/// only thing that produces `StatementCategory::Data` entries then.
async fn sample_data(source: &dyn SourceFlavour, target: &dyn TargetFlavour, tables: &[sql_schema_describer::TableSchema], target_schema: &str, sample_row_count: u32, cancellation: &CancellationToken) -> ConnectorResult<()> {
    for table in tables {
        cancellation.check()?;
        let rows = source.fetch_batch(table, 0, sample_row_count).await?;
        if !rows.is_empty() {
            target.bulk_insert(target_schema, table, &rows).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::SqlCollector;
    use async_trait::async_trait;
    use migration_connector::{DryRunSettings, PhaseFlags, Row, Vendor};
    use sql_schema_describer::{ColumnSchema, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema, ViewSchema};
    use std::collections::{HashMap, HashSet};

    #[derive(Debug)]
    struct StubSource {
        tables: Vec<TableSchema>,
        views: Vec<ViewSchema>,
    }

    #[async_trait]
    impl SourceFlavour for StubSource {
        fn vendor(&self) -> Vendor {
            Vendor::SqlServer
        }

        async fn read_tables(&self, _include: &HashSet<String>, _exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
            Ok(self.tables.clone())
        }

        async fn read_views(&self) -> ConnectorResult<Vec<ViewSchema>> {
            Ok(self.views.clone())
        }

        async fn row_count(&self, _table: &TableSchema) -> ConnectorResult<i64> {
            Ok(0)
        }

        async fn fetch_batch(&self, _table: &TableSchema, _offset: i64, _batch_size: u32) -> ConnectorResult<Vec<Row>> {
            Ok(vec![])
        }
    }

    #[derive(Debug, Default)]
    struct RecordingTarget {
        created_schema: std::sync::Mutex<bool>,
        created_foreign_keys: std::sync::Mutex<bool>,
        created_views: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TargetFlavour for RecordingTarget {
        fn vendor(&self) -> Vendor {
            Vendor::Postgres
        }

        async fn create_schema(&self, _target_schema: &str, _tables: &[TableSchema], _source: Vendor) -> ConnectorResult<()> {
            *self.created_schema.lock().unwrap() = true;
            Ok(())
        }

        async fn create_indexes(&self, _target_schema: &str, _indexes: &[IndexSchema], _source: Vendor, _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_constraints(&self, _target_schema: &str, _constraints: &[ConstraintSchema], _source: Vendor, _continue_on_error: bool) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_views(&self, _target_schema: &str, _source_schema: &str, views: &[ViewSchema], _source: Vendor, renames: &HashMap<String, String>, _continue_on_error: bool) -> ConnectorResult<()> {
            for view in views {
                let name = renames.get(&view.name).cloned().unwrap_or_else(|| view.name.clone());
                self.created_views.lock().unwrap().push(name);
            }
            Ok(())
        }

        async fn create_foreign_keys(&self, _target_schema: &str, _tables: &[TableSchema], _continue_on_error: bool) -> ConnectorResult<()> {
            *self.created_foreign_keys.lock().unwrap() = true;
            Ok(())
        }

        async fn bulk_insert(&self, _target_schema: &str, _table: &TableSchema, _rows: &[Row]) -> ConnectorResult<()> {
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

    #[derive(Debug, Default)]
    struct FlakyIndexTarget {
        attempted_indexes: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TargetFlavour for FlakyIndexTarget {
        fn vendor(&self) -> Vendor {
            Vendor::Postgres
        }

        async fn create_schema(&self, _target_schema: &str, _tables: &[TableSchema], _source: Vendor) -> ConnectorResult<()> {
            Ok(())
        }

        async fn create_indexes(&self, _target_schema: &str, indexes: &[IndexSchema], _source: Vendor, continue_on_error: bool) -> ConnectorResult<()> {
            for index in indexes {
                self.attempted_indexes.lock().unwrap().push(index.name.clone());
                if index.name == "ix_bad" {
                    let err = ConnectorError::DdlFailed { object: index.name.clone(), category: "Indexes", message: "duplicate key".into() };
                    if continue_on_error && !err.is_always_fatal() {
                        continue;
                    }
                    return Err(err);
                }
            }
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

        async fn bulk_insert(&self, _target_schema: &str, _table: &TableSchema, _rows: &[Row]) -> ConnectorResult<()> {
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

    #[tokio::test]
    async fn continue_on_error_skips_past_a_failing_index_instead_of_aborting_the_phase() {
        let mut request = sample_request();
        request.continue_on_error = true;
        request.phases = PhaseFlags { migrate_schema: false, migrate_data: false, migrate_indexes: true, migrate_constraints: false, migrate_views: false, migrate_foreign_keys: false };

        let indexed_table = TableSchema::new("dbo", "Users", vec![ColumnSchema::new("Id", "int", false)])
            .primary_key(vec!["Id".into()])
            .indexes(vec![
                IndexSchema::new("ix_good_1", "Users", "dbo", vec!["Id".into()]),
                IndexSchema::new("ix_bad", "Users", "dbo", vec!["Id".into()]),
                IndexSchema::new("ix_good_2", "Users", "dbo", vec!["Id".into()]),
            ]);
        let source = Arc::new(StubSource { tables: vec![indexed_table], views: vec![] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(FlakyIndexTarget::default());
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let state = run(&request, source, target_dyn, None, &CancellationToken::new()).await.unwrap();

        assert_eq!(state, RunState::Succeeded);
        let attempted = target.attempted_indexes.lock().unwrap();
        assert_eq!(attempted.as_slice(), ["ix_good_1", "ix_bad", "ix_good_2"]);
    }

    fn sample_request() -> MigrationRequest {
        let mut request = MigrationRequest::new(Vendor::SqlServer, "mssql://localhost", Vendor::Postgres, "postgres://localhost", "public");
        request.dry_run = DryRunSettings::default();
        request
    }

    #[tokio::test]
    async fn runs_every_phase_in_order_and_creates_foreign_keys_last() {
        let tables = vec![TableSchema::new("dbo", "Users", vec![ColumnSchema::new("Id", "int", false)])
            .primary_key(vec!["Id".into()])
            .foreign_keys(vec![ForeignKeySchema::new("fk_self", "Id", "dbo", "Users", "Id")])];
        let source = Arc::new(StubSource { tables, views: vec![ViewSchema::new("ActiveUsers", "dbo", "SELECT * FROM Users")] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(RecordingTarget::default());
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let state = run(&sample_request(), source, target_dyn, None, &CancellationToken::new()).await.unwrap();

        assert_eq!(state, RunState::Succeeded);
        assert!(*target.created_schema.lock().unwrap());
        assert!(*target.created_foreign_keys.lock().unwrap());
        assert_eq!(target.created_views.lock().unwrap()[0], "active_users");
    }

    #[tokio::test]
    async fn skips_disabled_phases() {
        let mut request = sample_request();
        request.phases = PhaseFlags {
            migrate_schema: false,
            migrate_data: false,
            migrate_indexes: false,
            migrate_constraints: false,
            migrate_views: false,
            migrate_foreign_keys: false,
        };

        let source = Arc::new(StubSource { tables: vec![], views: vec![] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(RecordingTarget::default());
        let target_dyn = target.clone() as Arc<dyn TargetFlavour>;

        let state = run(&request, source, target_dyn, None, &CancellationToken::new()).await.unwrap();

        assert_eq!(state, RunState::Succeeded);
        assert!(!*target.created_schema.lock().unwrap());
        assert!(!*target.created_foreign_keys.lock().unwrap());
    }

    #[tokio::test]
    async fn cancellation_before_the_run_surfaces_as_an_error() {
        let source = Arc::new(StubSource { tables: vec![], views: vec![] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(RecordingTarget::default()) as Arc<dyn TargetFlavour>;
        let token = CancellationToken::new();
        token.cancel();

        let result = run(&sample_request(), source, target, None, &token).await;
        assert!(matches!(result, Err(ConnectorError::Cancelled)));
    }

    #[tokio::test]
    async fn emits_phase_header_comments_when_dry_run_requests_them() {
        let mut request = sample_request();
        request.dry_run.emit_comments = true;

        let collector = Arc::new(SqlCollector::new());
        let source = Arc::new(StubSource { tables: vec![], views: vec![] }) as Arc<dyn SourceFlavour>;
        let target = Arc::new(RecordingTarget::default()) as Arc<dyn TargetFlavour>;

        run(&request, source, target, Some(collector.clone()), &CancellationToken::new()).await.unwrap();

        let script = collector.get_script();
        assert!(script.contains("=== Schema ==="));
        assert!(script.contains("=== ForeignKeys ==="));
    }
}
