//! The cross-vendor migration engine (spec §4): identifier conversion, type
//! mapping, dialect translation, dependency ordering, DDL rendering, and the
//! per-vendor drivers, wired together behind a single [`execute`] entry
//! point.

mod collector;
mod connection;
mod dialect;
mod flavour;
mod identifier;
mod migrator;
mod orchestrator;
mod renderer;
mod schema_rename;
mod sorter;
mod type_mapper;

pub use collector::SqlCollector;
pub use connection::Connection;
pub use flavour::{connect_source, build_target, SourceFlavour, TargetFlavour};
pub use orchestrator::RunState;

use migration_connector::{ConnectorResult, DryRunResult, MigrationRequest};
use std::sync::Arc;

/// Runs one migration end to end (spec §3's `Execute(request) ->
/// DryRunResult?`): validates the request, connects source and target, and
/// drives every enabled phase through to completion or the first fatal
/// error.
///
/// Returns `Some(DryRunResult)` only when `request.dry_run.enabled`; a live
/// run returns `None`.
#[tracing::instrument(skip(request), fields(source = %request.source_vendor.as_str(), target = %request.target_vendor.as_str(), dry_run = request.dry_run.enabled))]
pub async fn execute(request: MigrationRequest) -> ConnectorResult<Option<DryRunResult>> {
    let cancellation = migration_connector::CancellationToken::new();
    execute_with_cancellation(request, &cancellation).await
}

/// Same as [`execute`], but takes a caller-owned [`migration_connector::CancellationToken`]
/// so a long-running migration can be cancelled from outside this future.
pub async fn execute_with_cancellation(request: MigrationRequest, cancellation: &migration_connector::CancellationToken) -> ConnectorResult<Option<DryRunResult>> {
    request.validate()?;

    let source = flavour::connect_source(request.source_vendor, &request.source_connection_string).await?;
    let source: Arc<dyn SourceFlavour> = Arc::from(source);

    let collector = if request.dry_run.enabled { Some(Arc::new(SqlCollector::new())) } else { None };
    let target_collector = collector.clone().unwrap_or_else(|| Arc::new(SqlCollector::new()));

    let target = flavour::build_target(request.target_vendor, &request.target_connection_string, request.dry_run.enabled, target_collector).await?;
    let target: Arc<dyn TargetFlavour> = Arc::from(target);

    orchestrator::run(&request, source, target, collector.clone(), cancellation).await?;

    match collector {
        Some(collector) => {
            let mut result = collector.to_dry_run_result();
            if let Some(path) = &request.dry_run.output_path {
                result.write_to_path(path).map_err(|e| migration_connector::ConnectorError::InvalidConfiguration(format!("failed to write dry-run output to {path}: {e}")))?;
            }
            Ok(Some(result))
        }
        None => Ok(None),
    }
}
