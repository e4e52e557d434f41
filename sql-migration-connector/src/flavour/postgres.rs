use crate::collector::SqlCollector;
use crate::connection::Connection;
use crate::flavour::{quaint_common as common, SourceFlavour, TargetFlavour};
use crate::identifier;
use crate::renderer;
use async_trait::async_trait;
use migration_connector::{ConnectorError, ConnectorResult, DataReader, DataWriter, Row, SchemaReader, SchemaWriter, StatementCategory, Vendor};
use quaint::prelude::Queryable;
use quaint::single::Quaint;
use sql_schema_describer::{ColumnSchema, ConstraintKind, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct PostgresFlavour {
    connection: Connection<Quaint>,
}

impl PostgresFlavour {
    pub async fn connect(connection_string: &str) -> ConnectorResult<Self> {
        Ok(PostgresFlavour {
            connection: common::connect("postgres", connection_string).await?,
        })
    }

    pub fn collecting(collector: Arc<SqlCollector>) -> Self {
        PostgresFlavour { connection: Connection::Collecting(collector) }
    }
}

#[async_trait]
impl SchemaReader for PostgresFlavour {
    type Connection = Quaint;

    async fn read_tables(&self, conn: &Quaint, include: &HashSet<String>, exclude: &HashSet<String>) -> ConnectorResult<Vec<TableSchema>> {
        let schema = conn.connection_info().schema_name().to_string();
        let columns_sql = format!(
            "SELECT table_name, column_name, data_type, is_nullable, character_maximum_length, numeric_precision, numeric_scale, column_default, ordinal_position \
             FROM information_schema.columns WHERE table_schema = '{schema}' ORDER BY table_name, ordinal_position"
        );
        let result = conn.query_raw(&columns_sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        let mut tables: indexmap::IndexMap<String, TableSchema> = indexmap::IndexMap::new();
        for row in result.into_iter() {
            let table_name = row["table_name"].as_str().unwrap_or_default().to_string();
            if !passes_filter(&table_name, include, exclude) {
                continue;
            }
            let entry = tables.entry(table_name.clone()).or_insert_with(|| TableSchema::new(&schema, &table_name, Vec::new()));
            let is_nullable = row["is_nullable"].as_str().map(|s| s.eq_ignore_ascii_case("yes")).unwrap_or(true);
            let default_expr = row["column_default"].as_str().map(|s| s.to_string());
            let column = ColumnSchema {
                name: row["column_name"].as_str().unwrap_or_default().to_string(),
                source_type: row["data_type"].as_str().unwrap_or_default().to_string(),
                nullable: is_nullable,
                identity: default_expr.as_deref().map(|d| d.contains("nextval(")).unwrap_or(false),
                max_length: row["character_maximum_length"].as_i64(),
                numeric_precision: row["numeric_precision"].as_i64().map(|v| v as u32),
                numeric_scale: row["numeric_scale"].as_i64().map(|v| v as u32),
                default_expression: default_expr,
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
        let sql = format!("SELECT table_name, view_definition FROM information_schema.views WHERE table_schema = '{schema}'");
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.clone(), message: e.to_string() })?;

        Ok(result
            .into_iter()
            .map(|row| ViewSchema::new(row["table_name"].as_str().unwrap_or_default(), &schema, row["view_definition"].as_str().unwrap_or_default()))
            .collect())
    }
}

async fn read_primary_keys(conn: &Quaint, schema: &str, tables: &mut [TableSchema]) -> ConnectorResult<()> {
    let sql = format!(
        "SELECT tc.table_name, kcu.column_name FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         WHERE tc.table_schema = '{schema}' AND tc.constraint_type = 'PRIMARY KEY' ORDER BY kcu.ordinal_position"
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
        "SELECT tc.constraint_name, tc.table_name, kcu.column_name, ccu.table_name AS referenced_table, ccu.column_name AS referenced_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu ON tc.constraint_name = ccu.constraint_name AND tc.table_schema = ccu.table_schema \
         WHERE tc.table_schema = '{schema}' AND tc.constraint_type = 'FOREIGN KEY'"
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
        "SELECT t.relname AS table_name, i.relname AS index_name, a.attname AS column_name, ix.indisunique, ix.indisprimary \
         FROM pg_index ix \
         JOIN pg_class t ON t.oid = ix.indrelid \
         JOIN pg_class i ON i.oid = ix.indexrelid \
         JOIN pg_namespace n ON n.oid = t.relnamespace \
         JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
         WHERE n.nspname = '{schema}' ORDER BY t.relname, i.relname"
    );
    let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: schema.to_string(), message: e.to_string() })?;

    let mut by_index: indexmap::IndexMap<(String, String), IndexSchema> = indexmap::IndexMap::new();
    for row in result.into_iter() {
        let table_name = row["table_name"].as_str().unwrap_or_default().to_string();
        let index_name = row["index_name"].as_str().unwrap_or_default().to_string();
        let is_primary = row["indisprimary"].as_bool().unwrap_or(false);
        if is_primary {
            continue; // materialized by the table's own primary key clause
        }
        let entry = by_index.entry((table_name.clone(), index_name.clone())).or_insert_with(|| {
            IndexSchema::new(&index_name, &table_name, schema, Vec::new()).unique(row["indisunique"].as_bool().unwrap_or(false))
        });
        entry.columns.push(row["column_name"].as_str().unwrap_or_default().to_string());
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
        "SELECT tc.table_name, tc.constraint_name, cc.check_clause \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.check_constraints cc ON tc.constraint_name = cc.constraint_name AND tc.table_schema = cc.constraint_schema \
         WHERE tc.table_schema = '{schema}' AND tc.constraint_type = 'CHECK'"
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
                row["check_clause"].as_str().unwrap_or_default(),
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
impl DataReader for PostgresFlavour {
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
            "SELECT {select_list} FROM {}.{} ORDER BY {} OFFSET {offset} LIMIT {batch_size}",
            quote_ident(&table.schema),
            quote_ident(&table.name),
            quote_ident(order_column)
        );
        let result = conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SchemaReadFailed { object: table.qualified_name(), message: e.to_string() })?;
        Ok(common::rows_from_result_set(result, &column_names))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

#[async_trait]
impl SchemaWriter for PostgresFlavour {
    type Connection = Quaint;

    async fn create_schema(&self, _conn: &Quaint, _target_schema: &str, _tables: &[TableSchema]) -> ConnectorResult<()> {
        unreachable!("PostgresFlavour drives schema writes through TargetFlavour, not the bare SchemaWriter connection")
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
impl DataWriter for PostgresFlavour {
    type Connection = Quaint;

    async fn bulk_insert(&self, conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
        insert_rows(conn, target_schema, table, rows).await
    }

    async fn reset_sequences(&self, conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
        reset_sequence(conn, target_schema, table).await
    }

    async fn disable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("SET session_replication_role = 'replica'").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "disable", message: e.to_string() })
    }

    async fn enable_constraints(&self, conn: &Quaint) -> ConnectorResult<()> {
        conn.raw_cmd("SET session_replication_role = 'origin'").await.map_err(|e| ConnectorError::ConstraintToggleFailed { action: "enable", message: e.to_string() })
    }
}

async fn insert_rows(conn: &Quaint, target_schema: &str, table: &TableSchema, rows: &[Row]) -> ConnectorResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    conn.raw_cmd("BEGIN").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })?;

    let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
    for row in rows {
        let values: Vec<String> = row.0.iter().map(render_literal).collect();
        let sql = format!(
            "INSERT INTO {}.{} ({}) VALUES ({})",
            quote_ident(target_schema),
            quote_ident(&table.name),
            columns.join(", "),
            values.join(", ")
        );
        if let Err(e) = conn.raw_cmd(&sql).await {
            let _ = conn.raw_cmd("ROLLBACK").await;
            return Err(ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() });
        }
    }

    conn.raw_cmd("COMMIT").await.map_err(|e| ConnectorError::BulkInsertFailed { table: table.qualified_name(), message: e.to_string() })
}

fn render_literal(value: &migration_connector::RowValue) -> String {
    use migration_connector::RowValue;
    match value {
        RowValue::Null => "NULL".to_string(),
        RowValue::Boolean(b) => b.to_string(),
        RowValue::Int32(i) => i.to_string(),
        RowValue::Int64(i) => i.to_string(),
        RowValue::Decimal(d) => d.clone(),
        RowValue::Float64(f) => f.to_string(),
        RowValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        RowValue::Bytes(b) => format!("'\\x{}'", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
        RowValue::DateTime(dt) => format!("'{}'", dt.to_rfc3339()),
        RowValue::Uuid(u) => format!("'{u}'"),
    }
}

async fn reset_sequence(conn: &Quaint, target_schema: &str, table: &TableSchema) -> ConnectorResult<()> {
    let Some(pk_column) = table.primary_key.first() else { return Ok(()) };
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{target_schema}.{}', '{pk_column}'), COALESCE((SELECT MAX({}) FROM {}.{}), 1))",
        table.name,
        quote_ident(pk_column),
        quote_ident(target_schema),
        quote_ident(&table.name)
    );
    conn.query_raw(&sql, &[]).await.map_err(|e| ConnectorError::SequenceResetFailed { table: table.qualified_name(), message: e.to_string() })?;
    Ok(())
}

#[async_trait]
impl SourceFlavour for PostgresFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::Postgres
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
impl TargetFlavour for PostgresFlavour {
    fn vendor(&self) -> Vendor {
        Vendor::Postgres
    }

    async fn create_schema(&self, target_schema: &str, tables: &[TableSchema], source: Vendor) -> ConnectorResult<()> {
        for table in tables {
            let sql = renderer::render_create_table(table, target_schema, source, Vendor::Postgres)?;
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
            let sql = renderer::render_create_index(index, target_schema, source, Vendor::Postgres);
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
            let sql = renderer::render_constraint(constraint, target_schema, source, Vendor::Postgres);
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
            let sql = renderer::render_create_view(view, source_schema, target_schema, source, Vendor::Postgres, renames);
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
        for sql in renderer::render_foreign_keys(tables, target_schema, Vendor::Postgres) {
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
                    let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
                    let values: Vec<String> = row.0.iter().map(render_literal).collect();
                    let sql = format!("INSERT INTO {}.{} ({}) VALUES ({})", quote_ident(target_schema), quote_ident(&table.name), columns.join(", "), values.join(", "));
                    collector.capture(sql, StatementCategory::Data, Some(table.qualified_name()));
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
                collector.capture("SET session_replication_role = 'replica'", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }

    async fn enable_constraints(&self) -> ConnectorResult<()> {
        match &self.connection {
            Connection::Live(db) => DataWriter::enable_constraints(self, db).await,
            Connection::Collecting(collector) => {
                collector.capture("SET session_replication_role = 'origin'", StatementCategory::Constraints, None);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_filter_respects_include_and_exclude() {
        let mut include = HashSet::new();
        include.insert("users".to_string());
        let exclude = HashSet::new();
        assert!(passes_filter("users", &include, &exclude));
        assert!(!passes_filter("orders", &include, &exclude));
    }

    #[test]
    fn literal_rendering_escapes_quotes() {
        let value = migration_connector::RowValue::Text("O'Brien".to_string());
        assert_eq!(render_literal(&value), "'O''Brien'");
    }
}
