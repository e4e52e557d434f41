//! Shared plumbing for the three `quaint`-backed flavours (Postgres, MySQL,
//! SQL Server). Catalog queries and vendor-specific DDL quirks stay in each
//! vendor's own module; everything here is genuinely identical across the
//! three.

use crate::collector::SqlCollector;
use crate::connection::Connection;
use crate::flavour::connection_failed;
use migration_connector::{ConnectorError, ConnectorResult, Row, RowValue, StatementCategory};
use quaint::prelude::Queryable;
use quaint::single::Quaint;
use quaint::Value;
use std::sync::Arc;

pub(crate) async fn connect(vendor: &'static str, connection_string: &str) -> ConnectorResult<Connection<Quaint>> {
    let db = Quaint::new(connection_string).await.map_err(|e| connection_failed(vendor, e))?;
    Ok(Connection::Live(db))
}

/// Runs `sql` against a live connection, or captures it when collecting.
pub(crate) async fn execute(connection: &Connection<Quaint>, sql: String, category: StatementCategory, object_name: Option<String>, mut on_error: impl FnMut(String) -> ConnectorError) -> ConnectorResult<()> {
    match connection {
        Connection::Live(db) => db.raw_cmd(&sql).await.map_err(|e| on_error(e.to_string())),
        Connection::Collecting(collector) => {
            collector.capture(sql, category, object_name);
            Ok(())
        }
    }
}

/// Like [`execute`], but folds in the per-object continue-on-error policy
/// (spec §4.8): when `continue_on_error` is set and the failure isn't one of
/// the kinds spec §7 marks always fatal, logs a warning and returns `Ok`
/// instead of propagating, so the caller's loop moves on to the next object
/// rather than aborting the whole phase.
pub(crate) async fn execute_continuing(connection: &Connection<Quaint>, sql: String, category: StatementCategory, object_name: Option<String>, on_error: impl FnMut(String) -> ConnectorError, continue_on_error: bool) -> ConnectorResult<()> {
    let logged_name = object_name.clone();
    match execute(connection, sql, category, object_name, on_error).await {
        Ok(()) => Ok(()),
        Err(e) if continue_on_error && !e.is_always_fatal() => {
            tracing::warn!(error = %e, object = ?logged_name, "object creation failed, continuing past it");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn collector_of(connection: &Connection<Quaint>) -> Option<Arc<SqlCollector>> {
    connection.collector().cloned()
}

pub(crate) use crate::identifier::validate_identifiers;

pub(crate) fn live_db(connection: &Connection<Quaint>) -> ConnectorResult<&Quaint> {
    connection.live().ok_or_else(|| ConnectorError::InvalidConfiguration("operation requires a live connection but the flavour is in dry-run collecting mode".to_string()))
}

pub(crate) fn quaint_to_row_value(value: &Value<'_>) -> RowValue {
    if value.is_null() {
        return RowValue::Null;
    }
    if let Some(b) = value.as_bool() {
        return RowValue::Boolean(b);
    }
    if let Some(i) = value.as_i64() {
        return RowValue::Int64(i);
    }
    if let Some(f) = value.as_f64() {
        return RowValue::Float64(f);
    }
    if let Some(n) = value.as_numeric() {
        return RowValue::Decimal(n.to_string());
    }
    if let Some(dt) = value.as_datetime() {
        return RowValue::DateTime(dt);
    }
    if let Some(u) = value.as_uuid() {
        return RowValue::Uuid(u);
    }
    if let Some(bytes) = value.as_bytes() {
        return RowValue::Bytes(bytes.to_vec());
    }
    if let Some(s) = value.as_str() {
        return RowValue::Text(s.to_string());
    }
    RowValue::Null
}

pub(crate) fn row_value_to_quaint(value: &RowValue) -> Value<'static> {
    match value {
        RowValue::Null => Value::null_text(),
        RowValue::Boolean(b) => Value::boolean(*b),
        RowValue::Int32(i) => Value::int32(*i),
        RowValue::Int64(i) => Value::int64(*i),
        RowValue::Decimal(d) => match d.parse::<bigdecimal::BigDecimal>() {
            Ok(parsed) => Value::numeric(parsed),
            Err(_) => Value::text(d.clone()),
        },
        RowValue::Float64(f) => Value::double(*f),
        RowValue::Text(s) => Value::text(s.clone()),
        RowValue::Bytes(b) => Value::bytes(b.clone()),
        RowValue::DateTime(dt) => Value::datetime(*dt),
        RowValue::Uuid(u) => Value::uuid(*u),
    }
}

/// Converts a result set into rows, reading columns by name in
/// `column_names`' order — the order the caller's `SELECT` listed them in,
/// which is also the order the target table's columns expect.
pub(crate) fn rows_from_result_set(result: quaint::connector::ResultSet, column_names: &[String]) -> Vec<Row> {
    let mut rows = Vec::new();
    for row in result.into_iter() {
        let values = column_names.iter().map(|name| quaint_to_row_value(&row[name.as_str()])).collect();
        rows.push(Row::new(values));
    }
    rows
}
