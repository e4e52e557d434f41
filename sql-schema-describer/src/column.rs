use serde::{Deserialize, Serialize};

/// One column of a table, as read from the source catalog.
///
/// `source_type` is kept as the vendor's own type string (e.g. `"varchar"`,
/// `"NUMBER"`) rather than pre-normalized; normalization into a target type
/// is the [type mapper's](../../sql-migration-connector) job, which needs the
/// original spelling to look up vendor-specific quirks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub source_type: String,
    pub nullable: bool,
    pub identity: bool,
    /// `None` when the type carries no length (e.g. `INTEGER`).
    /// `Some(sql_schema_describer::UNBOUNDED_LENGTH)` means "unbounded".
    pub max_length: Option<i64>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    pub default_expression: Option<String>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>, nullable: bool) -> Self {
        ColumnSchema {
            name: name.into(),
            source_type: source_type.into(),
            nullable,
            identity: false,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            default_expression: None,
        }
    }

    pub fn identity(mut self, identity: bool) -> Self {
        self.identity = identity;
        self
    }

    pub fn max_length(mut self, len: i64) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn precision_scale(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> Self {
        self.default_expression = Some(expr.into());
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_length == Some(crate::UNBOUNDED_LENGTH)
    }
}
