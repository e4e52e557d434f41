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
pub struct MysqlFlavour {
    connection: Connection<Quaint>,
}

impl MysqlFlavour {
    pub async fn connect(connection_string: &str) -> ConnectorResult<Self> {
        Ok(MysqlFlavour {
            connection: common::connect("mysql", connection_string).await?,
        })
    }

    pub fn collecting(collector: Arc<SqlCollector>) -> Self {
        MysqlFlavour { connection: Connection::Collecting(collector) }
    }
}

#[async_trait]
impl SchemaReader for MysqlFlavour {
    type Connection = Quaint;

    async fn read_tables(&self, conn: &Quaint, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
        let schema = conn.connection_info().schema_name().to_string();
        let columns_sql = format!(
            "SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, IS_NULLABLE, CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, NUMERIC_SCALE, COLUMN_DEFAULT, EXTRA, ORDINAL_POSITION \
             FROM information_schema.columns WHERE table_schema = '{schema}' ORDER BY TABLE_NAME, ORDINAL_POSITION"
        );
        let result = conn.query_raw(&columns_sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        let mut tables: indexmap::IndexMap<String, TableSchema> = indexmap::IndexMap::new();
        for row in result.into_iter() {
            let table_name = row["TABLE_NAME"].as_str().unwrap_or_default().to_string();
            if !passes_filter(&table_name, include, exclude) {
                continue;
            }
            let entry = tables.entry(table_name.clone()).or_insert_with(|| TableSchema::new(&schema, &table_name, Vec::new()));
            let is_nullable = row["IS_NULLABLE"].as_str().map(|s| s.eq_ignore_ascii_case("yes")).unwrap_or(true);
            let extra = row["EXTRA"].as_str().unwrap_or_default();
            let column = ColumnSchema {
                name: row["COLUMN_NAME"].as_str().unwrap_or_default().to_string(),
                source_type: row["DATA_TYPE"].as_str().unwrap_or_default().to_string(),
                nullable: is_nullable,
                identity: extra.to_ascii_lowercase().contains("auto_increment"),
                max_length: row["CHARACTER_MAXIMUM_LENGTH"].as_i64(),
                numeric_precision: row["NUMERIC_PRECISION"].as_i64().map(|v| v as u32),
                numeric_scale: row["NUMERIC_SCALE"].as_i64().map(|v| v as u32),
                default_expression: row["COLUMN_DEFAULT"].as_str().map(|s| s.to_string()),
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
        let sql = format!("SELECT TABLE_NAME, VIEW_DEFINITION FROM information_schema.views WHERE TABLE_SCHEMA = '{schema}'");
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        Ok(result
            .into_iter()
            .map(|row| ViewSchema::new(row["TABLE_NAME"].as_str().unwrap_or_default(), &schema, row["VIEW_DEFINITION"].as_str().unwrap_or_default()))
            .collect())
    }
}

async fn read_primary_keys(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT TABLE_NAME, COLUMN_NAME FROM information_schema.key_column_usage \
         WHERE TABLE_SCHEMA = '{schema}' AND CONSTRAINT_NAME = 'PRIMARY' ORDER BY ORDINAL_POSITION"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;
    for row in result.into_iter() {
        let table_name = row["TABLE_NAME"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.primary_key.push(row["COLUMN_NAME"].as_str().unwrap_or_default().to_string());
        }
    }
    Ok(())
}

async fn read_foreign_keys(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT CONSTRAINT_NAME, TABLE_NAME, COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
         FROM information_schema.key_column_usage \
         WHERE TABLE_SCHEMA = '{schema}' AND REFERENCED_TABLE_NAME IS NOT NULL ORDER BY ORDINAL_POSITION"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;
    for row in result.into_iter() {
        let table_name = row["TABLE_NAME"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.foreign_keys.push(ForeignKeySchema::new(
                row["CONSTRAINT_NAME"].as_str().unwrap_or_default(),
                row["COLUMN_NAME"].as_str().unwrap_or_default(),
                schema,
                row["REFERENCED_TABLE_NAME"].as_str().unwrap_or_default(),
                row["REFERENCED_COLUMN_NAME"].as_str().unwrap_or_default(),
            ));
        }
    }
    Ok(())
}

async fn read_indexes(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT TABLE_NAME, INDEX_NAME, COLUMN_NAME, NON_UNIQUE FROM information_schema.statistics \
         WHERE TABLE_SCHEMA = '{schema}' AND INDEX_NAME != 'PRIMARY' ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;

    let mut by_index: indexmap::IndexMap<(String, String), IndexSchema> = indexmap::IndexMap::new();
    for row in result.into_iter() {
        let table_name = row["TABLE_NAME"].as_str().unwrap_or_default().to_string();
        let index_name = row["INDEX_NAME"].as_str().unwrap_or_default().to_string();
        let non_unique = row["NON_UNIQUE"].as_i64().unwrap_or(1) != 0;
        let entry = by_index.entry((table_name.clone(), index_name.clone())).or_insert_with(|| IndexSchema::new(&index_name, &table_name, schema, Vec::new()).unique(!non_unique));
        entry.columns.push(row["COLUMN_NAME"].as_str().unwrap_or_default().to_string());
    }

    for ((table_name, _), index) in by_index {
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.indexes.push(index);
        }
    }
    Ok(())
}

/// MySQL only exposes `information_schema.check_constraints` from 8.0.16
/// onward; older servers simply report none, which is fine — `CHECK`
/// support on the writer side only ever depends on what was actually read.
async fn read_check_constraints(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT tc.TABLE_NAME, tc.CONSTRAINT_NAME, cc.CHECK_CLAUSE \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.check_constraints cc ON tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME AND tc.TABLE_SCHEMA = cc.CONSTRAINT_SCHEMA \
         WHERE tc.TABLE_SCHEMA = '{schema}' AND tc.CONSTRAINT_TYPE = 'CHECK'"
    );
    let result = match conn.query_raw(&sql, &[]).await {
        Ok(result) => result,
        // Server predates information_schema.check_constraints: no checks to report.
        Err(_) => return Ok(()),
    };
    for row in result.into_iter() {
        let table_name = row["TABLE_NAME"].as_str().unwrap_or_default();
        if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
            table.constraints.push(ConstraintSchema::check(
                row["CONSTRAINT_NAME"].as_str().unwrap_or_default(),
                table_name,
                schema,
                Vec::new(),
                row["CHECK_CLAUSE"].as_str().unwrap_or_default(),
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
impl DataReader for MysqlFlavour {
    type Connection = Quaint;

    async fn row_count(&self, conn: &Quaint, table: &TableSchema) -> ConnectorResult<i64> {
        common::validate_identifiers([table.schema.as_str(), table.name.as_str()])?;
        let sql = format!("SELECT COUNT(*) AS count FROM {}.{}", quote_ident(&table.schema), quote_ident(&table.name));
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
            "SELECT {select_list} FROM {}.{} ORDER BY {} LIMIT {batch_size} OFFSET {offset}",
            quote_ident(&table.schema),
            quote_ident(&table.name),
            quote_ident(order_column)
        );
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: table.qualified_name(), message: e.to_string() })?;
        Ok(common::rows_from_result_set(result, &column_names))
    }
}

fn quote_ident(name: &str) -> String {
    format!("`{name}`")
}

#[async_trait]
impl SchemaWriter for MysqlFlavour {
    type Connection = Quaint;

    async fn create_schema(&self, _conn: &Quaint, _target_schema: &str, _tables: &[TableSchema]) -> ConnectorResult<()> {
        unreachable!("MysqlFlavour drives schema writes through TargetFlavour, not the bare SchemaWriter connection")
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
impl DataWriter for MysqlFlavour {
    type Connection = Quaint;

    async fn bulk_insert(&self, conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
        insert_rows(conn, target_schema, table, rows).await
    }

    async fn reset_sequences(&self, conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
        reset_auto_increment(conn, target_schema, table).await
    }

    async fn disable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("SET FOREIGN_KEY_CHECKS=0").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "disable", message: e.to_string() })
    }

    async fn enable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("SET FOREIGN_KEY_CHECKS=1").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "enable", message: e.to_string() })
    }
}

async fn insert_rows(conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    conn.raw_cmd("START TRANSACTION").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })?;

    for row in rows {
        let sql = render_insert(target_schema, table, row);
        if let Err(e) = conn.raw_cmd(&sql).await {
            let _ = conn.raw_cmd("ROLLBACK").await;
            return Err(ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() });
        }
    }

    conn.raw_cmd("COMMIT").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })
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
        RowValue::Text(s) => format!("'{}'", s.replace('\'', "''").replace('\\', "\\\\")),
        RowValue::Bytes(b) => format!("X'{}'", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        RowValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")),
        RowValue::Uuid(u) => format!("'{u}'"),
    }
}

/// MySQL has no independent sequence object: the auto-increment counter is
/// a table-level property, advanced with `ALTER TABLE ... AUTO_INCREMENT = n`.
async fn reset_auto_increment(conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
    let Some(pk_column) = table.primary_key.first() else { return Ok(()) };
    let max_sql = format!("SELECT MAX({}) AS m FROM {}.{}", quote_ident(pk_column), quote_ident(target_schema), quote_ident(&table.name));
    let result = conn.query_raw(&max_sql, &[]).await.map_err(|e| ConnectorError::SequenceResetFailed { table: table.qualified_name(), message: e.to_string() })?;
    let max = result.into_iter().next().and_then(|r| r["m"].as_i64()).unwrap_or(0);
    let next = max + 1;
    let alter_sql = format!("ALTER TABLE {}.{} AUTO_INCREMENT = {next}", quote_ident(target_schema), quote_ident(&table.name));
    conn.raw_cmd(&alter_sql).await.map_err(|e| ConnectorError::SequenceResetFailed { table: table.qualified_name(), message: e.to_string() })?;
    Ok(())
}

#[async_trait]
impl SourceFlavour for MysqlFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::MySql
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
impl TargetFlavour for MysqlFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::MySql
    }

    async fn create_schema(&self, target_schema: &str, tables: &[TableSchema], source: Vendor) -> ConnectorResult<()> {
        for table in tables {
            let sql = renderer::render_create_table(table, target_schema, source, Vendor::MySql)?;
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
            let sql = renderer::render_create_index(index, target_schema, source, Vendor::MySql);
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
            let sql = renderer::render_constraint(constraint, target_schema, source, Vendor::MySql);
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
            let sql = renderer::render_create_view(view, source_schema, target_schema, source, Vendor::MySql, renames);
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
        for sql in renderer::render_foreign_keys(tables, target_schema, Vendor::MySql) {
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
                for row in rows {
                    collector.capture(render_insert(target_schema, table, row), StatementCategory::Data, Some(table.qualified_name()));
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
                collector.capture("SET FOREIGN_KEY_CHECKS=0", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }

    async fn enable_constraints(&self) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::enable_constraints(self, db).await,
            Connection::Collecting(collector) => {
                collector.capture("SET FOREIGN_KEY_CHECKS=1", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rendering_escapes_quotes_and_backslashes() {
        let value = migration_connector::RowValue::Text("back\\slash'quote".to_string());
        assert_eq!(render_literal(&value), "'back\\\\slash''quote'");
    }

    #[test]
    fn booleans_render_as_zero_or_one() {
        assert_eq!(render_literal(&migration_connector::RowValue::Boolean(true)), "1");
        assert_eq!(render_literal(&migration_connector::RowValue::Boolean(false)), "0");
    }
}
