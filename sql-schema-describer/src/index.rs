use serde::{Deserialize, Serialize};

/// An index, as read from the source catalog.
///
/// A `primary_key_backing` index is skipped at create time: it is
/// materialized implicitly by the table's `PRIMARY KEY` clause instead of a
/// separate `CREATE INDEX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub table: String,
    pub schema: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub clustered: bool,
    pub primary_key_backing: bool,
    pub filter_expression: Option<String>,
    pub included_columns: Vec<String>,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>, schema: impl Into<String>, columns: Vec<String>) -> Self {
        IndexSchema {
            name: name.into(),
            table: table.into(),
            schema: schema.into(),
            columns,
            unique: false,
            clustered: false,
            primary_key_backing: false,
            filter_expression: None,
            included_columns: Vec::new(),
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn clustered(mut self, clustered: bool) -> Self {
        self.clustered = clustered;
        self
    }

    pub fn primary_key_backing(mut self, yes: bool) -> Self {
        self.primary_key_backing = yes;
        self
    }

    pub fn filter_expression(mut self, expr: impl Into<String>) -> Self {
        self.filter_expression = Some(expr.into());
        self
    }

    pub fn included_columns(mut self, columns: Vec<String>) -> Self {
        self.included_columns = columns;
        self
    }

    /// Indexes the orchestrator should actually `CREATE INDEX` for: PK-backing
    /// entries are materialized by the table's own `PRIMARY KEY` clause.
    pub fn is_creatable(&self) -> bool {
        !self.primary_key_backing
    }
}
