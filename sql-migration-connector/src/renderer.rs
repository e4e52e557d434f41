//! Target-side DDL text rendering (spec §4.5). Pure string building: no
//! flavour here ever talks to a driver directly, so the same render paths
//! are exercised whether the caller is about to execute the SQL or just
//! capture it for a dry run.
//!
//! Every name passed in is assumed already converted by
//! [`crate::schema_rename::convert_tables`] — this module only quotes and
//! assembles, it never renames.

use crate::dialect;
use crate::type_mapper;
use migration_connector::{ConnectorResult, Vendor};
use sql_schema_describer::{foreign_key, ColumnSchema, ConstraintKind, ConstraintSchema, ForeignKeySchema, IndexSchema, TableSchema, ViewSchema};
use std::collections::HashMap;

fn quote(target: Vendor, name: &str) -> String {
    let (open, close) = target.quote_chars();
    format!("{open}{name}{close}")
}

/// Renders one `CREATE TABLE` statement. Foreign keys are never inlined;
/// they are always applied later via [`render_foreign_keys`] so that tables
/// forming a dependency cycle can still be created in some order.
pub fn render_create_table(table: &TableSchema, target_schema: &str, source: Vendor, target: Vendor) -> ConnectorResult<String> {
    let mut column_lines = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        column_lines.push(render_column(column, source, target));
    }

    let mut body = column_lines.join(",\n    ");

    if !table.primary_key.is_empty() {
        let pk_columns: Vec<String> = table.primary_key.iter().map(|c| quote(target, c)).collect();
        body.push_str(&format!(",\n    PRIMARY KEY ({})", pk_columns.join(", ")));
    }

    Ok(format!("CREATE TABLE {}.{} (\n    {}\n)", quote(target, target_schema), quote(target, &table.name), body))
}

fn render_column(column: &ColumnSchema, source: Vendor, target: Vendor) -> String {
    let type_str = type_mapper::map_type(column, target);
    let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
    let identity = if column.identity { render_identity_clause(target) } else { "" };

    let default = match &column.default_expression {
        Some(expr) if !expr.trim().is_empty() => {
            let target_is_boolean = type_str.eq_ignore_ascii_case("boolean") || type_str.eq_ignore_ascii_case("bit");
            let translated = dialect::translate_default_expression(expr, source, target, target_is_boolean);
            format!(" DEFAULT {translated}")
        }
        _ => String::new(),
    };

    format!("{} {}{}{} {}", quote(target, &column.name), type_str, identity, default, nullability).trim_end().to_string()
}

fn render_identity_clause(target: Vendor) -> &'static str {
    match target {
        Vendor::SqlServer => " IDENTITY(1,1)",
        Vendor::Postgres => " GENERATED BY DEFAULT AS IDENTITY",
        Vendor::MySql => " AUTO_INCREMENT",
        Vendor::Oracle => " GENERATED BY DEFAULT AS IDENTITY",
    }
}

pub fn render_create_index(index: &IndexSchema, target_schema: &str, source: Vendor, target: Vendor) -> String {
    let columns: Vec<String> = index.columns.iter().map(|c| quote(target, c)).collect();
    let unique = if index.unique { "UNIQUE " } else { "" };

    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {}.{} ({})",
        quote(target, &index.name),
        quote(target, target_schema),
        quote(target, &index.table),
        columns.join(", ")
    );

    if !index.included_columns.is_empty() {
        let included: Vec<String> = index.included_columns.iter().map(|c| quote(target, c)).collect();
        sql.push_str(&format!(" INCLUDE ({})", included.join(", ")));
    }

    if let Some(filter) = index.filter_expression.as_deref().filter(|expr| !expr.trim().is_empty()) {
        let translated = dialect::translate_filter_expression(filter, source, target);
        sql.push_str(&format!(" WHERE {translated}"));
    }

    sql
}

pub fn render_constraint(constraint: &ConstraintSchema, target_schema: &str, source: Vendor, target: Vendor) -> String {
    let qualified_table = format!("{}.{}", quote(target, target_schema), quote(target, &constraint.table));

    match constraint.kind {
        ConstraintKind::Check => {
            let expr = constraint.check_expression.as_deref().unwrap_or("");
            let translated = dialect::translate_check_expression(expr, source, target);
            format!("ALTER TABLE {qualified_table} ADD CONSTRAINT {} CHECK ({translated})", quote(target, &constraint.name))
        }
        ConstraintKind::Unique => {
            let columns: Vec<String> = constraint.columns.iter().map(|c| quote(target, c)).collect();
            format!("ALTER TABLE {qualified_table} ADD CONSTRAINT {} UNIQUE ({})", quote(target, &constraint.name), columns.join(", "))
        }
        ConstraintKind::Default => {
            let column = constraint.columns.first().map(String::as_str).unwrap_or("");
            let expr = constraint.default_expression.as_deref().unwrap_or("");
            let column_type = constraint.source_column_type.as_deref().unwrap_or("");
            let target_is_boolean = column_type.eq_ignore_ascii_case("bit") || column_type.eq_ignore_ascii_case("boolean");
            let translated = dialect::translate_default_expression(expr, source, target, target_is_boolean);
            format!("ALTER TABLE {qualified_table} ALTER COLUMN {} SET DEFAULT {translated}", quote(target, column))
        }
    }
}

pub fn render_create_view(view: &ViewSchema, source_schema: &str, target_schema: &str, source: Vendor, target: Vendor, renames: &HashMap<String, String>) -> String {
    let body = dialect::translate_view_body(&view.definition, source, target, source_schema, target_schema, renames);
    let view_name = renames.get(&view.name).cloned().unwrap_or_else(|| view.name.clone());
    format!("CREATE VIEW {}.{} AS {}", quote(target, target_schema), quote(target, &view_name), body)
}

/// Renders one `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` statement per
/// grouped constraint name (spec §4.4's multi-column grouping).
pub fn render_foreign_keys(tables: &[TableSchema], target_schema: &str, target: Vendor) -> Vec<String> {
    let mut statements = Vec::new();

    for table in tables {
        for (constraint_name, entries) in foreign_key::group_by_constraint(&table.foreign_keys) {
            statements.push(render_one_foreign_key(constraint_name, entries, &table.name, target_schema, target));
        }
    }

    statements
}

fn render_one_foreign_key(constraint_name: &str, entries: Vec<&ForeignKeySchema>, table_name: &str, target_schema: &str, target: Vendor) -> String {
    let local_columns: Vec<String> = entries.iter().map(|fk| quote(target, &fk.column)).collect();
    let referenced_columns: Vec<String> = entries.iter().map(|fk| quote(target, &fk.referenced_column)).collect();
    let referenced_table = &entries[0].referenced_table;

    format!(
        "ALTER TABLE {}.{} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}.{} ({})",
        quote(target, target_schema),
        quote(target, table_name),
        quote(target, constraint_name),
        local_columns.join(", "),
        quote(target, target_schema),
        quote(target, referenced_table),
        referenced_columns.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sql_schema_describer::ColumnSchema;

    #[test]
    fn renders_create_table_with_primary_key_and_identity() {
        let table = TableSchema::new("dbo", "users", vec![ColumnSchema::new("id", "int", false).identity(true), ColumnSchema::new("email", "varchar", false).max_length(255)]).primary_key(vec!["id".into()]);

        let sql = render_create_table(&table, "public", Vendor::SqlServer, Vendor::Postgres).unwrap();
        assert!(sql.contains("CREATE TABLE \"public\".\"users\""));
        assert!(sql.contains("\"id\" INT GENERATED BY DEFAULT AS IDENTITY"));
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn renders_unique_constraint() {
        let constraint = ConstraintSchema::unique("uq_email", "users", "dbo", vec!["email".into()]);
        let sql = render_constraint(&constraint, "public", Vendor::SqlServer, Vendor::MySql);
        assert_eq!(sql, "ALTER TABLE `public`.`users` ADD CONSTRAINT `uq_email` UNIQUE (`email`)");
    }

    #[test]
    fn renders_filtered_index_with_translated_predicate_and_include_clause() {
        let index = IndexSchema::new("ix_active_email", "users", "dbo", vec!["email".into()])
            .unique(true)
            .filter_expression("[deleted_at] IS NULL")
            .included_columns(vec!["created_at".into()]);

        let sql = render_create_index(&index, "public", Vendor::SqlServer, Vendor::Postgres);
        assert_eq!(sql, "CREATE UNIQUE INDEX \"ix_active_email\" ON \"public\".\"users\" (\"email\") INCLUDE (\"created_at\") WHERE \"deleted_at\" IS NULL");
    }

    #[test]
    fn groups_multi_column_foreign_keys_into_one_statement() {
        let table = TableSchema::new("dbo", "order_items", vec![ColumnSchema::new("order_id", "int", false), ColumnSchema::new("tenant_id", "int", false)]).foreign_keys(vec![
            ForeignKeySchema::new("fk_order_items", "order_id", "dbo", "orders", "id"),
            ForeignKeySchema::new("fk_order_items", "tenant_id", "dbo", "orders", "tenant_id"),
        ]);

        let statements = render_foreign_keys(&[table], "public", Vendor::Postgres);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("FOREIGN KEY (\"order_id\", \"tenant_id\")"));
    }
}
