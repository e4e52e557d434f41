//! Applies the identifier converter (spec §4.1) to an entire schema in one
//! consistent pass, so every later stage — DDL rendering, data migration,
//! view-body rewriting — sees the same target names for the same source
//! objects.

use crate::identifier;
use migration_connector::{ConnectorResult, NamingConvention, Vendor};
use sql_schema_describer::{ColumnSchema, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema};
use std::collections::HashMap;

/// The result of converting a schema: tables with every identifier already
/// rewritten into the target's style, plus a case-insensitive
/// original-name-to-converted-name map for anything downstream that still
/// needs to look a name up (view body rewriting, logging).
pub struct ConvertedSchema {
    pub tables: Vec<TableSchema>,
    pub renames: HashMap<String, String>,
}

pub fn convert_tables(tables: Vec<TableSchema>, target: Vendor, convention: NamingConvention, max_len: usize) -> ConnectorResult<ConvertedSchema> {
    let mut renames = HashMap::new();
    let mut table_name_map: HashMap<(String, String), String> = HashMap::new();

    for table in &tables {
        let converted = identifier::convert(&table.name, target, convention, max_len)?;
        table_name_map.insert((table.schema.clone(), table.name.clone()), converted.clone());
        renames.insert(table.name.clone(), converted);
    }

    let mut converted_tables = Vec::with_capacity(tables.len());
    for table in tables {
        converted_tables.push(convert_one_table(table, target, convention, max_len, &table_name_map, &mut renames)?);
    }

    Ok(ConvertedSchema { tables: converted_tables, renames })
}

fn convert_one_table(table: TableSchema, target: Vendor, convention: NamingConvention, max_len: usize, table_name_map: &HashMap<(String, String), String>, renames: &mut HashMap<String, String>) -> ConnectorResult<TableSchema> {
    let new_name = table_name_map[&(table.schema.clone(), table.name.clone())].clone();

    let mut columns = Vec::with_capacity(table.columns.len());
    for column in table.columns {
        columns.push(convert_column(column, target, convention, max_len, renames)?);
    }

    let mut primary_key = Vec::with_capacity(table.primary_key.len());
    for pk_col in &table.primary_key {
        primary_key.push(renames.get(pk_col).cloned().unwrap_or_else(|| pk_col.clone()));
    }

    let mut foreign_keys = Vec::with_capacity(table.foreign_keys.len());
    for fk in table.foreign_keys {
        foreign_keys.push(convert_foreign_key(fk, target, convention, max_len, table_name_map, renames)?);
    }

    let mut indexes = Vec::with_capacity(table.indexes.len());
    for index in table.indexes {
        indexes.push(convert_index(index, &new_name, target, convention, max_len, renames)?);
    }

    let mut constraints = Vec::with_capacity(table.constraints.len());
    for constraint in table.constraints {
        constraints.push(convert_constraint(constraint, &new_name, target, convention, max_len, renames)?);
    }

    Ok(TableSchema {
        schema: table.schema,
        name: new_name,
        columns,
        primary_key,
        foreign_keys,
        indexes,
        constraints,
    })
}

fn convert_column(column: ColumnSchema, target: Vendor, convention: NamingConvention, max_len: usize, renames: &mut HashMap<String, String>) -> ConnectorResult<ColumnSchema> {
    let new_name = identifier::convert(&column.name, target, convention, max_len)?;
    renames.insert(column.name.clone(), new_name.clone());
    Ok(ColumnSchema { name: new_name, ..column })
}

fn convert_foreign_key(fk: ForeignKeySchema, target: Vendor, convention: NamingConvention, max_len: usize, table_name_map: &HashMap<(String, String), String>, renames: &mut HashMap<String, String>) -> ConnectorResult<ForeignKeySchema> {
    let new_constraint_name = identifier::convert(&fk.constraint_name, target, convention, max_len)?;
    renames.insert(fk.constraint_name.clone(), new_constraint_name.clone());

    let new_column = renames.get(&fk.column).cloned().unwrap_or_else(|| fk.column.clone());
    let new_referenced_table = table_name_map
        .get(&(fk.referenced_schema.clone(), fk.referenced_table.clone()))
        .cloned()
        .unwrap_or(fk.referenced_table.clone());
    let new_referenced_column = identifier::convert(&fk.referenced_column, target, convention, max_len)?;

    Ok(ForeignKeySchema {
        constraint_name: new_constraint_name,
        column: new_column,
        referenced_schema: fk.referenced_schema,
        referenced_table: new_referenced_table,
        referenced_column: new_referenced_column,
    })
}

fn convert_index(index: IndexSchema, table_new_name: &str, target: Vendor, convention: NamingConvention, max_len: usize, renames: &mut HashMap<String, String>) -> ConnectorResult<IndexSchema> {
    let new_name = identifier::convert(&index.name, target, convention, max_len)?;
    renames.insert(index.name.clone(), new_name.clone());

    let columns = index.columns.iter().map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone())).collect();
    let included_columns = index.included_columns.iter().map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone())).collect();

    Ok(IndexSchema {
        name: new_name,
        table: table_new_name.to_string(),
        schema: index.schema,
        columns,
        unique: index.unique,
        clustered: index.clustered,
        primary_key_backing: index.primary_key_backing,
        filter_expression: index.filter_expression,
        included_columns,
    })
}

fn convert_constraint(constraint: ConstraintSchema, table_new_name: &str, target: Vendor, convention: NamingConvention, max_len: usize, renames: &mut HashMap<String, String>) -> ConnectorResult<ConstraintSchema> {
    let new_name = identifier::convert(&constraint.name, target, convention, max_len)?;
    renames.insert(constraint.name.clone(), new_name.clone());

    let columns = constraint.columns.iter().map(|c| renames.get(c).cloned().unwrap_or_else(|| c.clone())).collect();

    Ok(ConstraintSchema {
        name: new_name,
        table: table_new_name.to_string(),
        schema: constraint.schema,
        kind: constraint.kind,
        columns,
        check_expression: constraint.check_expression,
        default_expression: constraint.default_expression,
        source_column_type: constraint.source_column_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn converts_table_column_and_primary_key_consistently() {
        let table = TableSchema::new("dbo", "UserAccount", vec![ColumnSchema::new("UserId", "int", false), ColumnSchema::new("EmailAddress", "varchar", false)]).primary_key(vec!["UserId".to_string()]);

        let converted = convert_tables(vec![table], Vendor::Postgres, NamingConvention::Auto, 63).unwrap();
        let table = &converted.tables[0];
        assert_eq!(table.name, "user_account");
        assert_eq!(table.columns[0].name, "user_id");
        assert_eq!(table.primary_key, vec!["user_id".to_string()]);
        assert_eq!(converted.renames["UserAccount"], "user_account");
    }

    #[test]
    fn foreign_key_referenced_table_tracks_the_new_name() {
        let orders = TableSchema::new("dbo", "Orders", vec![ColumnSchema::new("Id", "int", false)]).primary_key(vec!["Id".to_string()]);
        let items = TableSchema::new("dbo", "OrderItems", vec![ColumnSchema::new("OrderId", "int", false)]).foreign_keys(vec![ForeignKeySchema::new("FkOrderItemsOrder", "OrderId", "dbo", "Orders", "Id")]);

        let converted = convert_tables(vec![orders, items], Vendor::Postgres, NamingConvention::Auto, 63).unwrap();
        let items = converted.tables.iter().find(|t| t.name == "order_items").unwrap();
        assert_eq!(items.foreign_keys[0].referenced_table, "orders");
        assert_eq!(items.foreign_keys[0].column, "order_id");
    }
}
