//! Oracle support, built on the synchronous `oracle` crate rather than
//! `quaint` (which has no Oracle backend). Every driver call is off-loaded
//! to a blocking thread via [`tokio::task::spawn_blocking`], per spec §9's
//! "model each provider call as a blocking function invoked from a bounded
//! worker pool" guidance — the connection itself lives behind a `Mutex` so
//! it can be shared across the `async fn`s the traits require.

use crate::collector::SqlCollector;
use crate::flavour::{connection_failed, SourceFlavour, TargetFlavour};
use crate::renderer;
use async_trait::async_trait;
use migration_connector::{ConnectorError, ConnectorResult, Row, RowValue, StatementCategory, Vendor};
use oracle::Connection as OracleConnection;
use sql_schema_describer::{ColumnSchema, ConstraintKind, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

enum Handle {
    Live(Arc<Mutex<OracleConnection>>),
    Collecting(Arc<SqlCollector>),
}

#[derive(Debug)]
pub struct OracleFlavour {
    handle: HandleDebug,
    /// The schema (owner) catalog queries filter on. Captured from the
    /// connection string at connect time rather than read back from the
    /// driver, since the `oracle` crate exposes no username accessor.
    owner: String,
}

/// `oracle::Connection` has no `Debug` impl; this just reports which mode
/// the flavour is in, mirroring what the other flavours' derived `Debug`
/// shows for their own connection wrapper.
struct HandleDebug(Handle);

impl std::fmt::Debug for HandleDebug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Handle::Live(_) => f.write_str("OracleFlavour::Live"),
            Handle::Collecting(_) => f.write_str("OracleFlavour::Collecting"),
        }
    }
}

/// Connection strings are `user/password@connect_string`; `oracle`'s own
/// `Connection::connect` takes the three parts separately.
fn split_connection_string(connection_string: &str) -> ConnectorResult<(String, String, String)> {
    let (credentials, connect_string) = connection_string.split_once('@').ok_or_else(|| {
        ConnectorError::InvalidConfiguration("Oracle connection string must be in `user/password@connect_string` form".to_string())
    })?;
    let (user, password) = credentials.split_once('/').ok_or_else(|| {
        ConnectorError::InvalidConfiguration("Oracle connection string must be in `user/password@connect_string` form".to_string())
    })?;
    Ok((user.to_string(), password.to_string(), connect_string.to_string()))
}

impl OracleFlavour {
    pub async fn connect(connection_string: &str) -> ConnectorResult<Self> {
        let (user, password, connect_string) = split_connection_string(connection_string)?;
        let owner = user.to_ascii_uppercase();
        let conn = tokio::task::spawn_blocking(move || OracleConnection::connect(&user, &password, &connect_string))
            .await
            .map_err(|e| connection_failed("oracle", e))?
            .map_err(|e| connection_failed("oracle", e))?;
        Ok(OracleFlavour {
            handle: HandleDebug(Handle::Live(Arc::new(Mutex::new(conn)))),
            owner,
        })
    }

    pub fn collecting(collector: Arc<SqlCollector>) -> Self {
        OracleFlavour {
            handle: HandleDebug(Handle::Collecting(collector)),
            owner: String::new(),
        }
    }

    fn live(&self) -> ConnectorResult<Arc<Mutex<OracleConnection>>> {
        match &self.handle.0 {
            Handle::Live(conn) => Ok(conn.clone()),
            Handle::Collecting(_) => Err(ConnectorError::InvalidConfiguration("operation requires a live connection but the flavour is in dry-run collecting mode".to_string())),
        }
    }

    fn collector(&self) -> Option<Arc<SqlCollector>> {
        match &self.handle.0 {
            Handle::Collecting(collector) => Some(collector.clone()),
            Handle::Live(_) => None,
        }
    }

    /// Runs a blocking catalog/DML query on the worker pool and maps
    /// `oracle::Error` into `SchemaReadFailed`.
    async fn query_blocking<T, F>(&self, object: &str, f: F) -> ConnectorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&OracleConnection) -> oracle::Result<T> + Send + 'static,
    {
        let conn = self.live()?;
        let object = object.to_string();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("oracle connection mutex poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| ConnectorError::SchemaReadFailed { object: object.clone(), message: e.to_string() })?
        .map_err(|e| ConnectorError::SchemaReadFailed { object, message: e.to_string() })
    }

    async fn execute_ddl(&self, sql: String, category: StatementCategory, object: String) -> ConnectorResult<()> {
        if let Some(collector) = self.collector() {
            collector.capture(sql, category, Some(object));
            return Ok(());
        }
        let conn = self.live()?;
        let ddl_object = object.clone();
        let ddl_category = category_label(category);
        let sql_for_blocking = sql.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("oracle connection mutex poisoned");
            guard.execute(&sql_for_blocking, &[])
        })
        .await
        .map_err(|e| ConnectorError::DdlFailed { object: ddl_object.clone(), category: ddl_category, message: e.to_string() })?
        .map_err(|e| ConnectorError::DdlFailed { object: ddl_object, category: ddl_category, message: e.to_string() })?;
        Ok(())
    }

    /// Like [`Self::execute_ddl`], but folds in the per-object
    /// continue-on-error policy (spec §4.8): a non-fatal failure is logged
    /// and swallowed instead of propagating, so the caller's loop moves on
    /// to the next object rather than aborting the whole phase.
    async fn execute_ddl_continuing(&self, sql: String, category: StatementCategory, object: String, continue_on_error: bool) -> ConnectorResult<()> {
        let logged_object = object.clone();
        match self.execute_ddl(sql, category, object).await {
            Ok(()) => Ok(()),
            Err(e) if continue_on_error && !e.is_always_fatal() => {
                tracing::warn!(error = %e, object = %logged_object, "object creation failed, continuing past it");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn category_label(category: StatementCategory) -> &'static str {
    match category {
        StatementCategory::Schema => "Schema",
        StatementCategory::Tables => "Tables",
        StatementCategory::Data => "Data",
        StatementCategory::Indexes => "Indexes",
        StatementCategory::Constraints => "Constraints",
        StatementCategory::ForeignKeys => "ForeignKeys",
        StatementCategory::Views => "Views",
        StatementCategory::Comment => "Comment",
    }
}

fn passes_filter(name: &str, include: &HashSet<String>, exclude: &HashSet<String>) -> bool {
    if !include.is_empty() && !include.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        return false;
    }
    !exclude.iter().any(|n| n.eq_ignore_ascii_case(name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

fn opt_string(row: &oracle::Row, col: &str) -> Option<String> {
    row.get::<_, Option<String>>(col).unwrap_or(None)
}

fn read_tables_blocking(conn: &OracleConnection, owner: &str, include: &HashSet<String>, exclude: &HashSet<String>) -> oracle::Result<Vec<TableSchema>> {
    let columns_sql = "SELECT table_name, column_name, data_type, nullable, data_length, data_precision, data_scale, data_default, column_id \
         FROM all_tab_columns WHERE owner = :1 ORDER BY table_name, column_id";
    let rows = conn.query(columns_sql, &[&owner])?;

    let mut tables: indexmap::IndexMap<String, TableSchema> = indexmap::IndexMap::new();
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        if !passes_filter(&table_name, include, exclude) {
            continue;
        }
        let entry = tables.entry(table_name.clone()).or_insert_with(|| TableSchema::new(&owner, &table_name, Vec::new()));
        let nullable: String = row.get("nullable").unwrap_or_else(|_| "Y".to_string());
        let data_length: Option<i64> = row.get("data_length").ok();
        let default_expr = opt_string(&row, "data_default").map(|s| s.trim().to_string());
        let column = ColumnSchema {
            name: row.get("column_name")?,
            source_type: row.get("data_type")?,
            nullable: nullable.eq_ignore_ascii_case("Y"),
            identity: false, // identity detected separately, below, via all_tab_identity_cols
            max_length: data_length,
            numeric_precision: row.get::<_, Option<i64>>("data_precision").ok().flatten().map(|v| v as u32),
            numeric_scale: row.get::<_, Option<i64>>("data_scale").ok().flatten().map(|v| v as u32),
            default_expression: default_expr,
        };
        entry.columns.push(column);
    }

    let mut tables: Vec<TableSchema> = tables.into_values().collect();

    mark_identity_columns(conn, &owner, &mut tables)?;
    read_primary_keys(conn, &owner, &mut tables)?;
    read_foreign_keys(conn, &owner, &mut tables)?;
    read_indexes(conn, &owner, &mut tables)?;
    read_check_constraints(conn, &owner, &mut tables)?;

    Ok(tables)
}

fn mark_identity_columns(conn: &OracleConnection, owner: &str, tables: &mut [TableSchema]) -> oracle::Result<()> {
    let sql = "SELECT table_name, column_name FROM all_tab_identity_cols WHERE owner = :1";
    let rows = conn.query(sql, &[&owner])?;
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        let column_name: String = row.get("column_name")?;
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            if let Some(column) = table.columns.iter_mut().find(|c| c.name == column_name) {
                column.identity = true;
            }
        }
    }
    Ok(())
}

fn read_primary_keys(conn: &OracleConnection, owner: &str, tables: &mut [TableSchema]) -> oracle::Result<()> {
    let sql = "SELECT cc.table_name, cc.column_name FROM all_constraints c \
               JOIN all_cons_columns cc ON cc.constraint_name = c.constraint_name AND cc.owner = c.owner \
               WHERE c.owner = :1 AND c.constraint_type = 'P' ORDER BY cc.position";
    let rows = conn.query(sql, &[&owner])?;
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.primary_key.push(row.get("column_name")?);
        }
    }
    Ok(())
}

fn read_foreign_keys(conn: &OracleConnection, owner: &str, tables: &mut [TableSchema]) -> oracle::Result<()> {
    let sql = "SELECT c.constraint_name, cc.table_name, cc.column_name, rc.table_name AS referenced_table, rcc.column_name AS referenced_column \
               FROM all_constraints c \
               JOIN all_cons_columns cc ON cc.constraint_name = c.constraint_name AND cc.owner = c.owner \
               JOIN all_constraints rc ON rc.constraint_name = c.r_constraint_name AND rc.owner = c.owner \
               JOIN all_cons_columns rcc ON rcc.constraint_name = rc.constraint_name AND rcc.owner = rc.owner AND rcc.position = cc.position \
               WHERE c.owner = :1 AND c.constraint_type = 'R'";
    let rows = conn.query(sql, &[&owner])?;
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.foreign_keys.push(ForeignKeySchema::new(
                row.get::<_, String>("constraint_name")?,
                row.get::<_, String>("column_name")?,
                owner,
                row.get::<_, String>("referenced_table")?,
                row.get::<_, String>("referenced_column")?,
            ));
        }
    }
    Ok(())
}

fn read_indexes(conn: &OracleConnection, owner: &str, tables: &mut [TableSchema]) -> oracle::Result<()> {
    let sql = "SELECT i.table_name, i.index_name, ic.column_name, i.uniqueness \
               FROM all_indexes i \
               JOIN all_ind_columns ic ON ic.index_name = i.index_name AND ic.index_owner = i.owner \
               WHERE i.owner = :1 AND i.index_name NOT IN (SELECT constraint_name FROM all_constraints WHERE owner = :1 AND constraint_type = 'P') \
               ORDER BY i.table_name, i.index_name, ic.column_position";
    let rows = conn.query(sql, &[&owner])?;

    let mut by_index: indexmap::IndexMap<(String, String), IndexSchema> = indexmap::IndexMap::new();
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        let index_name: String = row.get("index_name")?;
        let uniqueness: String = row.get("uniqueness").unwrap_or_else(|_| "NONUNIQUE".to_string());
        let entry = by_index
            .entry((table_name.clone(), index_name.clone()))
            .or_insert_with(|| IndexSchema::new(&index_name, &table_name, owner, Vec::new()).unique(uniqueness.eq_ignore_ascii_case("UNIQUE")));
        entry.columns.push(row.get("column_name")?);
    }

    for ((table_name, _), index) in by_index {
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.indexes.push(index);
        }
    }
    Ok(())
}

fn read_check_constraints(conn: &OracleConnection, owner: &str, tables: &mut [TableSchema]) -> oracle::Result<()> {
    // Oracle represents NOT NULL as a `C` constraint too; only ones with a
    // genuine predicate (not a bare `"COL" IS NOT NULL`) are real CHECKs.
    let sql = "SELECT table_name, constraint_name, search_condition FROM all_constraints \
               WHERE owner = :1 AND constraint_type = 'C' AND search_condition IS NOT NULL \
               AND search_condition NOT LIKE '%IS NOT NULL'";
    let rows = conn.query(sql, &[&owner])?;
    for row_result in rows {
        let row = row_result?;
        let table_name: String = row.get("table_name")?;
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.constraints.push(ConstraintSchema::check(row.get::<_, String>("constraint_name")?, &table_name, owner, Vec::new(), row.get::<_, String>("search_condition")?));
        }
    }
    Ok(())
}

fn read_views_blocking(conn: &OracleConnection, owner: &str) -> oracle::Result<Vec<ViewSchema>> {
    let sql = "SELECT view_name, text FROM all_views WHERE owner = :1";
    let rows = conn.query(sql, &[&owner])?;
    let mut views = Vec::new();
    for row_result in rows {
        let row = row_result?;
        views.push(ViewSchema::new(row.get::<_, String>("view_name")?, owner, row.get::<_, String>("text")?));
    }
    Ok(views)
}

fn row_count_blocking(conn: &OracleConnection, table: &TableSchema) -> oracle::Result<i64> {
    let sql = format!("SELECT COUNT(*) AS cnt FROM {}.{}", quote_ident(&table.schema), quote_ident(&table.name));
    conn.query_row_as::<i64>(&sql, &[])
}

fn fetch_batch_blocking(conn: &OracleConnection, table: &TableSchema, offset: i64, batch_size: u32) -> oracle::Result<Vec<Row>> {
    let order_column = table.primary_key.first().or_else(|| table.columns.first().map(|c| &c.name)).expect("table has no columns to order by");
    let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let select_list = column_names.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT {select_list} FROM {}.{} ORDER BY {} OFFSET {offset} ROWS FETCH NEXT {batch_size} ROWS ONLY",
        quote_ident(&table.schema),
        quote_ident(&table.name),
        quote_ident(order_column)
    );

    let rows = conn.query(&sql, &[])?;
    let mut out = Vec::new();
    for row_result in rows {
        let row = row_result?;
        let mut values = Vec::with_capacity(column_names.len());
        for name in &column_names {
            values.push(row.get::<_, Option<String>>(name.as_str())?.map(RowValue::Text).unwrap_or(RowValue::Null));
        }
        out.push(Row::new(values));
    }
    Ok(out)
}

#[async_trait]
impl SourceFlavour for OracleFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::Oracle
    }

    async fn read_tables(&self, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
        let include = include.clone();
        let exclude = exclude.clone();
        let owner = self.owner.clone();
        self.query_blocking("oracle schema", move |conn| read_tables_blocking(conn, &owner, &include, &exclude)).await
    }

    async fn read_views(&self) -> ConnectorResult<Vec<ViewSchema>> {
        let owner = self.owner.clone();
        self.query_blocking("oracle views", move |conn| read_views_blocking(conn, &owner)).await
    }

    async fn row_count(&self, table: &TableSchema) -> ConnectorResult<i64> {
        crate::identifier::validate_identifiers([table.schema.as_str(), table.name.as_str()])?;
        let table = table.clone();
        self.query_blocking(&table.qualified_name(), move |conn| row_count_blocking(conn, &table)).await
    }

    async fn fetch_batch(&self, table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>> {
        let order_column = table.primary_key.first().or_else(|| table.columns.first().map(|c| &c.name)).expect("table has no columns to order by");
        crate::identifier::validate_identifiers(
            std::iter::once(table.schema.as_str())
                .chain(std::iter::once(table.name.as_str()))
                .chain(std::iter::once(order_column.as_str()))
                .chain(table.columns.iter().map(|c| c.name.as_str())),
        )?;
        let table = table.clone();
        self.query_blocking(&table.qualified_name(), move |conn| fetch_batch_blocking(conn, &table, offset, batch_size)).await
    }
}

fn render_literal(value: &RowValue) -> String {
    match value {
        RowValue::Null => "NULL".to_string(),
        RowValue::Boolean(b) => if *b { "1".to_string() } else { "0".to_string() },
        RowValue::Int32(i) => i.to_string(),
        RowValue::Int64(i) => i.to_string(),
        RowValue::Decimal(d) => d.clone(),
        RowValue::Float64(f) => f.to_string(),
        RowValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        RowValue::Bytes(b) => format!("HEXTORAW('{}')", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        RowValue::DateTime(dt) => format!("TO_TIMESTAMP('{}', 'YYYY-MM-DD HH24:MI:SS.FF')", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        RowValue::Uuid(u) => format!("'{}'", u.simple()),
    }
}

fn render_insert(target_schema: &str, table: &TableSchema, row: &Row) -> String {
    let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let values: Vec<String> = row.0.iter().map(render_literal).collect();
    format!("INSERT INTO {}.{} ({}) VALUES ({})", quote_ident(target_schema), quote_ident(&table.name), columns.join(", "), values.join(", "))
}

#[async_trait]
impl TargetFlavour for OracleFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::Oracle
    }

    async fn create_schema(&self, target_schema: &str, tables: &[TableSchema], source: Vendor) -> ConnectorResult<()> {
        for table in tables {
            let sql = renderer::render_create_table(table, target_schema, source, Vendor::Oracle)?;
            self.execute_ddl(sql, StatementCategory::Tables, table.qualified_name()).await?;
        }
        Ok(())
    }

    async fn create_indexes(&self, target_schema: &str, indexes: &[IndexSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()> {
        for index in indexes.iter().filter(|i| i.is_creatable()) {
            let sql = renderer::render_create_index(index, target_schema, source, Vendor::Oracle);
            self.execute_ddl_continuing(sql, StatementCategory::Indexes, index.name.clone(), continue_on_error).await?;
        }
        Ok(())
    }

    async fn create_constraints(&self, target_schema: &str, constraints: &[ConstraintSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()> {
        for constraint in constraints {
            let sql = renderer::render_constraint(constraint, target_schema, source, Vendor::Oracle);
            let category = match constraint.kind {
                ConstraintKind::Check | ConstraintKind::Unique | ConstraintKind::Default => StatementCategory::Constraints,
            };
            self.execute_ddl_continuing(sql, category, constraint.name.clone(), continue_on_error).await?;
        }
        Ok(())
    }

    async fn create_views(&self, target_schema: &str, source_schema: &str, views: &[ViewSchema], source: Vendor, renames: &HashMap<String, String>, continue_on_error: bool) -> ConnectorResult<()> {
        for view in views {
            let sql = renderer::render_create_view(view, source_schema, target_schema, source, Vendor::Oracle, renames);
            self.execute_ddl_continuing(sql, StatementCategory::Views, view.name.clone(), continue_on_error).await?;
        }
        Ok(())
    }

    async fn create_foreign_keys(&self, target_schema: &str, tables: &[TableSchema], continue_on_error: bool) -> ConnectorResult<()> {
        for sql in renderer::render_foreign_keys(tables, target_schema, Vendor::Oracle) {
            self.execute_ddl_continuing(sql, StatementCategory::ForeignKeys, target_schema.to_string(), continue_on_error).await?;
        }
        Ok(())
    }

    async fn bulk_insert(&self, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(collector) = self.collector() {
            for row in rows {
                collector.capture(render_insert(target_schema, table, row), StatementCategory::Data, Some(table.qualified_name()));
            }
            return Ok(());
        }

        let conn = self.live()?;
        let target_schema = target_schema.to_string();
        let table = table.clone();
        let rows = rows.to_vec();
        let qualified = table.qualified_name();

        tokio::task::spawn_blocking(move || -> oracle::Result<()> {
            let guard = conn.lock().expect("oracle connection mutex poisoned");
            for row in &rows {
                let sql = render_insert(&target_schema, &table, row);
                if let Err(e) = guard.execute(&sql, &[]) {
                    let _ = guard.rollback();
                    return Err(e);
                }
            }
            guard.commit()
        })
        .await
        .map_err(|e| ConnectorError::BulkInsertFailed { table: qualified.clone(), message: e.to_string() })?
        .map_err(|e| ConnectorError::BulkInsertFailed { table: qualified, message: e.to_string() })
    }

    async fn reset_sequences(&self, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
        if self.collector().is_some() {
            return Ok(());
        }
        if !table.columns.iter().any(|c| c.identity) {
            return Ok(());
        }
        let Some(pk_column) = table.primary_key.first().cloned() else { return Ok(()) };

        let conn = self.live()?;
        let target_schema = target_schema.to_string();
        let table = table.clone();
        let qualified = table.qualified_name();

        tokio::task::spawn_blocking(move || -> oracle::Result<()> {
            let guard = conn.lock().expect("oracle connection mutex poisoned");
            let qualified_table = format!("{}.{}", quote_ident(&target_schema), quote_ident(&table.name));
            let max_sql = format!("SELECT MAX({}) AS m FROM {qualified_table}", quote_ident(&pk_column));
            let max: i64 = guard.query_row_as::<Option<i64>>(&max_sql, &[])?.unwrap_or(0);

            // Oracle identity columns own a hidden system-generated
            // sequence; the portable way to reseed it from SQL is to drop
            // and recreate the generated-always clause via the documented
            // `ALTER TABLE ... MODIFY ... GENERATED ALWAYS AS IDENTITY
            // (START WITH n)` form.
            let alter_sql = format!(
                "ALTER TABLE {qualified_table} MODIFY {} GENERATED BY DEFAULT AS IDENTITY (START WITH {})",
                quote_ident(&pk_column),
                max + 1
            );
            guard.execute(&alter_sql, &[])?;
            Ok(())
        })
        .await
        .map_err(|e| ConnectorError::SequenceResetFailed { table: qualified.clone(), message: e.to_string() })?
        .map_err(|e| ConnectorError::SequenceResetFailed { table: qualified, message: e.to_string() })
    }

    async fn disable_constraints(&self) -> ConnectorResult<()> {
        const SQL: &str = indoc::indoc! {r#"
            BEGIN
                FOR c IN (SELECT table_name, constraint_name FROM user_constraints WHERE constraint_type = 'R') LOOP
                    EXECUTE IMMEDIATE 'ALTER TABLE "' || c.table_name || '" DISABLE CONSTRAINT "' || c.constraint_name || '"';
                END LOOP;
            END;
        "#};
        if let Some(collector) = self.collector() {
            collector.capture(SQL, StatementCategory::Constraints, None);
            return Ok(());
        }
        let conn = self.live()?;
        tokio::task::spawn_blocking(move || guard_execute(&conn, SQL))
            .await
            .map_err(|e| ConnectorError::ConstraintToggleFailed { action: "disable", message: e.to_string() })?
            .map_err(|e| ConnectorError::ConstraintToggleFailed { action: "disable", message: e.to_string() })
    }

    async fn enable_constraints(&self) -> ConnectorResult<()> {
        const SQL: &str = indoc::indoc! {r#"
            BEGIN
                FOR c IN (SELECT table_name, constraint_name FROM user_constraints WHERE constraint_type = 'R') LOOP
                    EXECUTE IMMEDIATE 'ALTER TABLE "' || c.table_name || '" ENABLE CONSTRAINT "' || c.constraint_name || '"';
                END LOOP;
            END;
        "#};
        if let Some(collector) = self.collector() {
            collector.capture(SQL, StatementCategory::Constraints, None);
            return Ok(());
        }
        let conn = self.live()?;
        tokio::task::spawn_blocking(move || guard_execute(&conn, SQL))
            .await
            .map_err(|e| ConnectorError::ConstraintToggleFailed { action: "enable", message: e.to_string() })?
            .map_err(|e| ConnectorError::ConstraintToggleFailed { action: "enable", message: e.to_string() })
    }
}

fn guard_execute(conn: &Arc<Mutex<OracleConnection>>, sql: &str) -> oracle::Result<()> {
    let guard = conn.lock().expect("oracle connection mutex poisoned");
    guard.execute(sql, &[])?;
    guard.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_user_password_connect_string() {
        let (user, password, connect) = split_connection_string("scott/tiger@localhost:1521/orclpdb1").unwrap();
        assert_eq!(user, "scott");
        assert_eq!(password, "tiger");
        assert_eq!(connect, "localhost:1521/orclpdb1");
    }

    #[test]
    fn rejects_malformed_connection_string() {
        assert!(split_connection_string("not-a-valid-string").is_err());
    }

    #[test]
    fn literal_rendering_uses_hextoraw_for_bytes() {
        let value = RowValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(render_literal(&value), "HEXTORAW('deadbeef')");
    }
}
