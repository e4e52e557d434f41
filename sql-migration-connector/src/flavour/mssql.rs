use crate::collector::SqlCollector;
use crate::connection::Connection;
use crate::flavour::{quaint_common as common, SourceFlavour, TargetFlavour};
use crate::renderer;
use async_trait::async_trait;
use migration_connector::{ConnectorError, ConnectorResult, DataReader, DataWriter, Row, SchemaReader, SchemaWriter, StatementCategory, Vendor};
use quaint::prelude::Queryable;
use quaint::single::Quaint;
use sql_schema_describer::{ColumnSchema, ConstraintKind, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct MssqlFlavour {
    connection: Connection<Quaint>,
}

impl MssqlFlavour {
    pub async fn connect(connection_string: &str) -> ConnectorResult<Self> {
        Ok(MssqlFlavour {
            connection: common::connect("sqlserver", connection_string).await?,
        })
    }

    pub fn collecting(collector: Arc<SqlCollector>) -> Self {
        MssqlFlavour { connection: Connection::Collecting(collector) }
    }
}

#[async_trait]
impl SchemaReader for MssqlFlavour {
    type Connection = Quaint;

    async fn read_tables(&self, conn: &Quaint, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
        let schema = conn.connection_info().schema_name().to_string();
        let columns_sql = format!(
            "SELECT t.name AS table_name, c.name AS column_name, ty.name AS data_type, c.is_nullable, \
                    c.is_identity, c.max_length, c.precision, c.scale, \
                    OBJECT_DEFINITION(c.default_object_id) AS column_default, c.column_id \
             FROM sys.tables t \
             JOIN sys.schemas s ON s.schema_id = t.schema_id \
             JOIN sys.columns c ON c.object_id = t.object_id \
             JOIN sys.types ty ON ty.user_type_id = c.user_type_id \
             WHERE s.name = '{schema}' ORDER BY t.name, c.column_id"
        );
        let result = conn.query_raw(&columns_sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        let mut tables: indexmap::IndexMap<String, TableSchema> = indexmap::IndexMap::new();
        for row in result.into_iter() {
            let table_name = row["table_name"].as_str().unwrap_or_default().to_string();
            if !passes_filter(&table_name, include, exclude) {
                continue;
            }
            let entry = tables.entry(table_name.clone()).or_insert_with(|| TableSchema::new(&schema, &table_name, Vec::new()));
            let data_type = row["data_type"].as_str().unwrap_or_default().to_string();
            // sys.columns reports lengths in bytes for nchar/nvarchar; -1 means MAX, which already
            // matches sql_schema_describer::UNBOUNDED_LENGTH, and nvarchar byte lengths are halved
            // to character counts.
            let raw_length = row["max_length"].as_i64();
            let max_length = match (data_type.as_str(), raw_length) {
                (_, Some(-1)) => Some(sql_schema_describer::UNBOUNDED_LENGTH),
                ("nvarchar" | "nchar", Some(n)) if n > 0 => Some(n / 2),
                (_, other) => other,
            };
            let column = ColumnSchema {
                name: row["column_name"].as_str().unwrap_or_default().to_string(),
                source_type: data_type,
                nullable: row["is_nullable"].as_bool().unwrap_or(true),
                identity: row["is_identity"].as_bool().unwrap_or(false),
                max_length,
                numeric_precision: row["precision"].as_i64().map(|v| v as u32),
                numeric_scale: row["scale"].as_i64().map(|v| v as u32),
                default_expression: row["column_default"].as_str().map(|s| s.to_string()),
            };
            entry.columns.push(column);
        }

        let mut tables: Vec<TableSchema> = tables.into_values().collect();
        read_primary_keys(conn, &schema, &mut tables).await?;
        read_foreign_keys(conn, &schema, &mut tables).await?;
        read_indexes(conn, &schema, &mut tables).await?;
        read_check_constraints(conn, &schema, &mut tables).await?;

        Ok(tables)
    }

    async fn read_views(&self, conn: &Quaint) -> ConnectorResult<Vec<ViewSchema>> {
        let schema = conn.connection_info().schema_name().to_string();
        let sql = format!(
            "SELECT v.name AS view_name, OBJECT_DEFINITION(v.object_id) AS definition \
             FROM sys.views v JOIN sys.schemas s ON s.schema_id = v.schema_id WHERE s.name = '{schema}'"
        );
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        Ok(result
            .into_iter()
            .map(|row| ViewSchema::new(row["view_name"].as_str().unwrap_or_default(), &schema, row["definition"].as_str().unwrap_or_default()))
            .collect())
    }
}

async fn read_primary_keys(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT t.name AS table_name, c.name AS column_name FROM sys.key_constraints kc \
         JOIN sys.tables t ON t.object_id = kc.parent_object_id \
         JOIN sys.schemas s ON s.schema_id = t.schema_id \
         JOIN sys.index_columns ic ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id \
         JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
         WHERE kc.type = 'PK' AND s.name = '{schema}' ORDER BY ic.key_ordinal"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;
    for row in result.into_iter() {
        let table_name = row["table_name"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.primary_key.push(row["column_name"].as_str().unwrap_or_default().to_string());
        }
    }
    Ok(())
}

async fn read_foreign_keys(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT fk.name AS constraint_name, tp.name AS table_name, cp.name AS column_name, \
                tr.name AS referenced_table, cr.name AS referenced_column \
         FROM sys.foreign_key_columns fkc \
         JOIN sys.foreign_keys fk ON fk.object_id = fkc.constraint_object_id \
         JOIN sys.tables tp ON tp.object_id = fkc.parent_object_id \
         JOIN sys.schemas s ON s.schema_id = tp.schema_id \
         JOIN sys.columns cp ON cp.object_id = fkc.parent_object_id AND cp.column_id = fkc.parent_column_id \
         JOIN sys.tables tr ON tr.object_id = fkc.referenced_object_id \
         JOIN sys.columns cr ON cr.object_id = fkc.referenced_object_id AND cr.column_id = fkc.referenced_column_id \
         WHERE s.name = '{schema}'"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;
    for row in result.into_iter() {
        let table_name = row["table_name"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.foreign_keys.push(ForeignKeySchema::new(
                row["constraint_name"].as_str().unwrap_or_default(),
                row["column_name"].as_str().unwrap_or_default(),
                schema,
                row["referenced_table"].as_str().unwrap_or_default(),
                row["referenced_column"].as_str().unwrap_or_default(),
            ));
        }
    }
    Ok(())
}

async fn read_indexes(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT t.name AS table_name, i.name AS index_name, c.name AS column_name, i.is_unique, \
                i.type = 1 AS is_clustered, i.is_primary_key, i.filter_definition \
         FROM sys.indexes i \
         JOIN sys.tables t ON t.object_id = i.object_id \
         JOIN sys.schemas s ON s.schema_id = t.schema_id \
         JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.is_included_column = 0 \
         JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
         WHERE s.name = '{schema}' AND i.name IS NOT NULL ORDER BY t.name, i.name, ic.key_ordinal"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;

    let mut by_index: indexmap::IndexMap<(String, String), IndexSchema> = indexmap::IndexMap::new();
    for row in result.into_iter() {
        let table_name = row["table_name"].as_str().unwrap_or_default().to_string();
        let index_name = row["index_name"].as_str().unwrap_or_default().to_string();
        let is_primary = row["is_primary_key"].as_bool().unwrap_or(false);
        if is_primary {
            continue;
        }
        let entry = by_index.entry((table_name.clone(), index_name.clone())).or_insert_with(|| {
            IndexSchema::new(&index_name, &table_name, schema, Vec::new())
                .unique(row["is_unique"].as_bool().unwrap_or(false))
                .clustered(row["is_clustered"].as_bool().unwrap_or(false))
        });
        entry.columns.push(row["column_name"].as_str().unwrap_or_default().to_string());
        if let Some(filter) = row["filter_definition"].as_str() {
            entry.filter_expression = Some(filter.to_string());
        }
    }

    for ((table_name, _), index) in by_index {
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.indexes.push(index);
        }
    }
    Ok(())
}

async fn read_check_constraints(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT t.name AS table_name, cc.name AS constraint_name, cc.definition \
         FROM sys.check_constraints cc \
         JOIN sys.tables t ON t.object_id = cc.parent_object_id \
         JOIN sys.schemas s ON s.schema_id = t.schema_id \
         WHERE s.name = '{schema}'"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;
    for row in result.into_iter() {
        let table_name = row["table_name"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.constraints.push(ConstraintSchema::check(
                row["constraint_name"].as_str().unwrap_or_default(),
                table_name,
                schema,
                Vec::new(),
                row["definition"].as_str().unwrap_or_default(),
            ));
        }
    }
    Ok(())
}

fn passes_filter(name: &str, include: &HashSet<String>, exclude: &HashSet<String>) -> bool {
    if !include.is_empty() && !include.iter().any(|n| n.eq_ignore_ascii_case(name)) {
        return false;
    }
    !exclude.iter().any(|n| n.eq_ignore_ascii_case(name))
}

#[async_trait]
impl DataReader for MssqlFlavour {
    type Connection = Quaint;

    async fn row_count(&self, conn: &Quaint, table: &TableSchema) -> ConnectorResult<i64> {
        common::validate_identifiers([table.schema.as_str(), table.name.as_str()])?;
        let sql = format!("SELECT COUNT_BIG(*) AS count FROM {}.{}", quote_ident(&table.schema), quote_ident(&table.name));
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: table.qualified_name(), message: e.to_string() })?;
        Ok(result.into_iter().next().and_then(|r| r["count"].as_i64()).unwrap_or(0))
    }

    async fn fetch_batch(&self, conn: &Quaint, table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>> {
        let order_column = table.primary_key.first().or_else(|| table.columns.first().map(|c| &c.name)).ok_or_else(|| ConnectorError::SchemaReadFailed {
            object: table.qualified_name(),
            message: "table has no columns to order by".to_string(),
        })?;
        let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        common::validate_identifiers(std::iter::once(table.schema.as_str()).chain(std::iter::once(table.name.as_str())).chain(std::iter::once(order_column.as_str())).chain(column_names.iter().map(|c| c.as_str())))?;
        let select_list = column_names.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT {select_list} FROM {}.{} ORDER BY {} OFFSET {offset} ROWS FETCH NEXT {batch_size} ROWS ONLY",
            quote_ident(&table.schema),
            quote_ident(&table.name),
            quote_ident(order_column)
        );
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: table.qualified_name(), message: e.to_string() })?;
        Ok(common::rows_from_result_set(result, &column_names))
    }
}

fn quote_ident(name: &str) -> String {
    format!("[{name}]")
}

#[async_trait]
impl SchemaWriter for MssqlFlavour {
    type Connection = Quaint;

    async fn create_schema(&self, _conn: &Quaint, _target_schema: &str, _tables: &[TableSchema]) -> ConnectorResult<()> {
        unreachable!("MssqlFlavour drives schema writes through TargetFlavour, not the bare SchemaWriter connection")
    }

    async fn create_indexes(&self, _conn: &Quaint, _target_schema: &str, _indexes: &[IndexSchema]) -> ConnectorResult<()> {
        unreachable!("see create_schema")
    }

    async fn create_constraints(&self, _conn: &Quaint, _target_schema: &str, _constraints: &[ConstraintSchema]) -> ConnectorResult<()> {
        unreachable!("see create_schema")
    }

    async fn create_views(&self, _conn: &Quaint, _target_schema: &str, _views: &[ViewSchema], _source_tables: Option<&[TableSchema]>) -> ConnectorResult<()> {
        unreachable!("see create_schema")
    }

    async fn create_foreign_keys(&self, _conn: &Quaint, _target_schema: &str, _tables: &[TableSchema]) -> ConnectorResult<()> {
        unreachable!("see create_schema")
    }
}

#[async_trait]
impl DataWriter for MssqlFlavour {
    type Connection = Quaint;

    async fn bulk_insert(&self, conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
        insert_rows(conn, target_schema, table, rows).await
    }

    async fn reset_sequences(&self, conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
        reset_identity(conn, target_schema, table).await
    }

    async fn disable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("EXEC sp_msforeachtable \"ALTER TABLE ? NOCHECK CONSTRAINT ALL\"").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "disable", message: e.to_string() })
    }

    async fn enable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("EXEC sp_msforeachtable \"ALTER TABLE ? WITH CHECK CHECK CONSTRAINT ALL\"").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "enable", message: e.to_string() })
    }
}

/// Brackets the batch in `SET IDENTITY_INSERT ... ON/OFF` whenever the
/// table has an identity column, so source identity values are preserved
/// verbatim (spec §4.5).
async fn insert_rows(conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let has_identity = table.columns.iter().any(|c| c.identity);
    let qualified_table = format!("{}.{}", quote_ident(target_schema), quote_ident(&table.name));

    conn.raw_cmd("BEGIN TRANSACTION").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })?;

    if has_identity {
        conn.raw_cmd(&format!("SET IDENTITY_INSERT {qualified_table} ON")).await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })?;
    }

    for row in rows {
        let sql = render_insert(target_schema, table, row);
        if let Err(e) = conn.raw_cmd(&sql).await {
            let _ = conn.raw_cmd("ROLLBACK TRANSACTION").await;
            return Err(ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() });
        }
    }

    if has_identity {
        conn.raw_cmd(&format!("SET IDENTITY_INSERT {qualified_table} OFF")).await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })?;
    }

    conn.raw_cmd("COMMIT TRANSACTION").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })
}

fn render_insert(target_schema: &str, table: &TableSchema, row: &Row) -> String {
    let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let values: Vec<String> = row.0.iter().map(render_literal).collect();
    format!("INSERT INTO {}.{} ({}) VALUES ({})", quote_ident(target_schema), quote_ident(&table.name), columns.join(", "), values.join(", "))
}

fn render_literal(value: &migration_connector::RowValue) -> String {
    use migration_connector::RowValue;
    match value {
        RowValue::Null => "NULL".to_string(),
        RowValue::Boolean(b) => if *b { "1".to_string() } else { "0".to_string() },
        RowValue::Int32(i) => i.to_string(),
        RowValue::Int64(i) => i.to_string(),
        RowValue::Decimal(d) => d.clone(),
        RowValue::Float64(f) => f.to_string(),
        RowValue::Text(s) => format!("N'{}'", s.replace('\'', "''")),
        RowValue::Bytes(b) => format!("0x{}", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        RowValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        RowValue::Uuid(u) => format!("'{u}'"),
    }
}

async fn reset_identity(conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
    if !table.columns.iter().any(|c| c.identity) {
        return Ok(());
    }
    let Some(pk_column) = table.primary_key.first() else { return Ok(()) };
    let qualified_table = format!("{}.{}", quote_ident(target_schema), quote_ident(&table.name));
    let max_sql = format!("SELECT MAX({}) AS m FROM {qualified_table}", quote_ident(pk_column));
    let result = conn.query_raw(&max_sql, &[]).await.map_err(|e| ConnectorError::SequenceResetFailed { table: table.qualified_name(), message: e.to_string() })?;
    let max = result.into_iter().next().and_then(|r| r["m"].as_i64()).unwrap_or(0);
    let reseed_sql = format!("DBCC CHECKIDENT ('{qualified_table}', RESEED, {max})");
    conn.raw_cmd(&reseed_sql).await.map_err(|e| ConnectorError::SequenceResetFailed { table: table.qualified_name(), message: e.to_string() })?;
    Ok(())
}

#[async_trait]
impl SourceFlavour for MssqlFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::SqlServer
    }

    async fn read_tables(&self, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
        SchemaReader::read_tables(self, common::live_db(&self.connection)?, include, exclude).await
    }

    async fn read_views(&self) -> ConnectorResult<Vec<ViewSchema>> {
        SchemaReader::read_views(self, common::live_db(&self.connection)?).await
    }

    async fn row_count(&self, table: &TableSchema) -> ConnectorResult<i64> {
        DataReader::row_count(self, common::live_db(&self.connection)?, table).await
    }

    async fn fetch_batch(&self, table: &TableSchema, offset: i64, batch_size: u32) -> ConnectorResult<Vec<Row>> {
        DataReader::fetch_batch(self, common::live_db(&self.connection)?, table, offset, batch_size).await
    }
}

#[async_trait]
impl TargetFlavour for MssqlFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::SqlServer
    }

    async fn create_schema(&self, target_schema: &str, tables: &[TableSchema], source: Vendor) -> ConnectorResult<()> {
        for table in tables {
            let sql = renderer::render_create_table(table, target_schema, source, Vendor::SqlServer)?;
            common::execute(&self.connection, sql, StatementCategory::Tables, Some(table.qualified_name()), |message| ConnectorError::DdlFailed {
                object: table.qualified_name(),
                category: "Tables",
                message,
            })
            .await?;
        }
        Ok(())
    }

    async fn create_indexes(&self, target_schema: &str, indexes: &[IndexSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()> {
        for index in indexes.iter().filter(|i| i.is_creatable()) {
            let sql = renderer::render_create_index(index, target_schema, source, Vendor::SqlServer);
            common::execute_continuing(&self.connection, sql, StatementCategory::Indexes, Some(index.name.clone()), |message| ConnectorError::DdlFailed {
                object: index.name.clone(),
                category: "Indexes",
                message,
            }, continue_on_error)
            .await?;
        }
        Ok(())
    }

    async fn create_constraints(&self, target_schema: &str, constraints: &[ConstraintSchema], source: Vendor, continue_on_error: bool) -> ConnectorResult<()> {
        for constraint in constraints {
            let sql = renderer::render_constraint(constraint, target_schema, source, Vendor::SqlServer);
            let category = match constraint.kind {
                ConstraintKind::Check | ConstraintKind::Unique | ConstraintKind::Default => StatementCategory::Constraints,
            };
            common::execute_continuing(&self.connection, sql, category, Some(constraint.name.clone()), |message| ConnectorError::DdlFailed {
                object: constraint.name.clone(),
                category: "Constraints",
                message,
            }, continue_on_error)
            .await?;
        }
        Ok(())
    }

    async fn create_views(&self, target_schema: &str, source_schema: &str, views: &[ViewSchema], source: Vendor, renames: &HashMap<String, String>, continue_on_error: bool) -> ConnectorResult<()> {
        for view in views {
            let sql = renderer::render_create_view(view, source_schema, target_schema, source, Vendor::SqlServer, renames);
            common::execute_continuing(&self.connection, sql, StatementCategory::Views, Some(view.name.clone()), |message| ConnectorError::DdlFailed {
                object: view.name.clone(),
                category: "Views",
                message,
            }, continue_on_error)
            .await?;
        }
        Ok(())
    }

    async fn create_foreign_keys(&self, target_schema: &str, tables: &[TableSchema], continue_on_error: bool) -> ConnectorResult<()> {
        for sql in renderer::render_foreign_keys(tables, target_schema, Vendor::SqlServer) {
            common::execute_continuing(&self.connection, sql, StatementCategory::ForeignKeys, None, |message| ConnectorError::DdlFailed {
                object: target_schema.to_string(),
                category: "ForeignKeys",
                message,
            }, continue_on_error)
            .await?;
        }
        Ok(())
    }

    async fn bulk_insert(&self, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::bulk_insert(self, db, target_schema, table, rows).await,
            Connection::Collecting(collector) => {
                let has_identity = table.columns.iter().any(|c| c.identity);
                let qualified_table = format!("{}.{}", quote_ident(target_schema), quote_ident(&table.name));
                if has_identity {
                    collector.capture(format!("SET IDENTITY_INSERT {qualified_table} ON"), StatementCategory::Data, Some(table.qualified_name()));
                }
                for row in rows {
                    collector.capture(render_insert(target_schema, table, row), StatementCategory::Data, Some(table.qualified_name()));
                }
                if has_identity {
                    collector.capture(format!("SET IDENTITY_INSERT {qualified_table} OFF"), StatementCategory::Data, Some(table.qualified_name()));
                }
                Ok(())
            }
        }
    }

    async fn reset_sequences(&self, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::reset_sequences(self, db, target_schema, table).await,
            Connection::Collecting(_) => Ok(()),
        }
    }

    async fn disable_constraints(&self) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::disable_constraints(self, db).await,
            Connection::Collecting(collector) => {
                collector.capture("EXEC sp_msforeachtable \"ALTER TABLE ? NOCHECK CONSTRAINT ALL\"", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }

    async fn enable_constraints(&self) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::enable_constraints(self, db).await,
            Connection::Collecting(collector) => {
                collector.capture("EXEC sp_msforeachtable \"ALTER TABLE ? WITH CHECK CHECK CONSTRAINT ALL\"", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rendering_uses_national_string_prefix() {
        let value = migration_connector::RowValue::Text("O'Brien".to_string());
        assert_eq!(render_literal(&value), "N'O''Brien'");
    }

    #[test]
    fn passes_filter_is_case_insensitive() {
        let mut include = HashSet::new();
        include.insert("Users".to_string());
        let exclude = HashSet::new();
        assert!(passes_filter("users", &include, &exclude));
    }
}
