use crate::{ColumnSchema, ConstraintSchema, ForeignKeySchema, IndexSchema, SchemaModelError, SchemaModelResult};
use serde::{Deserialize, Serialize};

/// A table, exactly as declared by the source: columns in declaration
/// order, plus the keys, indexes, and non-key constraints that belong to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeySchema>,
    pub indexes: Vec<IndexSchema>,
    pub constraints: Vec<ConstraintSchema>,
}

impl TableSchema {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        TableSchema {
            schema: schema.into(),
            name: name.into(),
            columns,
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn foreign_keys(mut self, fks: Vec<ForeignKeySchema>) -> Self {
        self.foreign_keys = fks;
        self
    }

    pub fn indexes(mut self, indexes: Vec<IndexSchema>) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn constraints(mut self, constraints: Vec<ConstraintSchema>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// A machine-readable rendering of this table's shape, for callers that
    /// want to persist or diff a captured schema snapshot.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Distinct `(referenced_schema, referenced_table)` pairs this table's
    /// foreign keys point at, excluding self-references. Used by the
    /// dependency sorter to build edges.
    pub fn referenced_tables(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for fk in &self.foreign_keys {
            if fk.referenced_schema == self.schema && fk.referenced_table == self.name {
                continue; // self-reference: treated as absent for ordering purposes
            }
            let key = (fk.referenced_schema.clone(), fk.referenced_table.clone());
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
        out
    }

    /// Checks the invariants spec §3 lists for `TableSchema`: every primary
    /// and foreign key column name resolves to a declared column, and no
    /// identity column is nullable.
    pub fn validate(&self) -> SchemaModelResult<()> {
        for pk_col in &self.primary_key {
            if self.column(pk_col).is_none() {
                return Err(SchemaModelError::DanglingPrimaryKeyColumn {
                    table: self.qualified_name(),
                    column: pk_col.clone(),
                });
            }
        }

        for fk in &self.foreign_keys {
            if self.column(&fk.column).is_none() {
                return Err(SchemaModelError::DanglingForeignKeyColumn {
                    table: self.qualified_name(),
                    constraint: fk.constraint_name.clone(),
                    column: fk.column.clone(),
                });
            }
        }

        for column in &self.columns {
            if column.identity && column.nullable {
                return Err(SchemaModelError::NullableIdentityColumn {
                    table: self.qualified_name(),
                    column: column.name.clone(),
                });
            }
        }

        for constraint in &self.constraints {
            constraint.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id_column() -> ColumnSchema {
        ColumnSchema::new("id", "int", false).identity(true)
    }

    #[test]
    fn validates_clean_table() {
        let table = TableSchema::new("dbo", "users", vec![id_column(), ColumnSchema::new("email", "varchar", false).max_length(255)])
            .primary_key(vec!["id".into()]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn rejects_dangling_primary_key_column() {
        let table = TableSchema::new("dbo", "users", vec![id_column()]).primary_key(vec!["missing".into()]);
        assert!(matches!(table.validate(), Err(SchemaModelError::DanglingPrimaryKeyColumn { .. })));
    }

    #[test]
    fn rejects_nullable_identity_column() {
        let column = ColumnSchema::new("id", "int", true).identity(true);
        let table = TableSchema::new("dbo", "users", vec![column]);
        assert!(matches!(table.validate(), Err(SchemaModelError::NullableIdentityColumn { .. })));
    }

    #[test]
    fn self_references_are_excluded_from_referenced_tables() {
        let table = TableSchema::new("dbo", "nodes", vec![ColumnSchema::new("id", "int", false), ColumnSchema::new("parent_id", "int", true)])
            .foreign_keys(vec![ForeignKeySchema::new("fk_parent", "parent_id", "dbo", "nodes", "id")]);
        assert!(table.referenced_tables().is_empty());
    }

    #[test]
    fn to_json_round_trips() {
        let table = TableSchema::new("dbo", "users", vec![id_column()]).primary_key(vec!["id".into()]);
        let json = table.to_json().unwrap();
        let parsed: TableSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
    }
}
