use crate::{SchemaModelError, SchemaModelResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Check,
    Unique,
    Default,
}

/// A non-key constraint: `CHECK`, `UNIQUE`, or column `DEFAULT`.
///
/// Primary and foreign keys are modeled separately on [`crate::TableSchema`]
/// and [`crate::ForeignKeySchema`]; this type only covers what spec's phase 5
/// ("non-key constraints") applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSchema {
    pub name: String,
    pub table: String,
    pub schema: String,
    pub kind: ConstraintKind,
    pub columns: Vec<String>,
    pub check_expression: Option<String>,
    pub default_expression: Option<String>,
    pub source_column_type: Option<String>,
}

impl ConstraintSchema {
    pub fn check(name: impl Into<String>, table: impl Into<String>, schema: impl Into<String>, columns: Vec<String>, expr: impl Into<String>) -> Self {
        ConstraintSchema {
            name: name.into(),
            table: table.into(),
            schema: schema.into(),
            kind: ConstraintKind::Check,
            columns,
            check_expression: Some(expr.into()),
            default_expression: None,
            source_column_type: None,
        }
    }

    pub fn unique(name: impl Into<String>, table: impl Into<String>, schema: impl Into<String>, columns: Vec<String>) -> Self {
        ConstraintSchema {
            name: name.into(),
            table: table.into(),
            schema: schema.into(),
            kind: ConstraintKind::Unique,
            columns,
            check_expression: None,
            default_expression: None,
            source_column_type: None,
        }
    }

    pub fn default(
        name: impl Into<String>,
        table: impl Into<String>,
        schema: impl Into<String>,
        column: impl Into<String>,
        expr: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        ConstraintSchema {
            name: name.into(),
            table: table.into(),
            schema: schema.into(),
            kind: ConstraintKind::Default,
            columns: vec![column.into()],
            check_expression: None,
            default_expression: Some(expr.into()),
            source_column_type: Some(column_type.into()),
        }
    }

    /// Validates the kind-specific invariants from spec §3: `Check` requires
    /// a check expression, `Default` requires exactly one column and a
    /// default expression, `Unique` requires at least one column.
    pub fn validate(&self) -> SchemaModelResult<()> {
        match self.kind {
            ConstraintKind::Check if self.check_expression.is_none() => Err(SchemaModelError::CheckWithoutExpression {
                table: self.table.clone(),
                name: self.name.clone(),
            }),
            ConstraintKind::Default if self.columns.len() != 1 => Err(SchemaModelError::DefaultColumnCount {
                table: self.table.clone(),
                name: self.name.clone(),
                count: self.columns.len(),
            }),
            ConstraintKind::Default if self.default_expression.is_none() => Err(SchemaModelError::DefaultWithoutExpression {
                table: self.table.clone(),
                name: self.name.clone(),
            }),
            ConstraintKind::Unique if self.columns.is_empty() => Err(SchemaModelError::UniqueWithoutColumns {
                table: self.table.clone(),
                name: self.name.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_without_expression_is_rejected() {
        let c = ConstraintSchema {
            name: "ck_age".into(),
            table: "users".into(),
            schema: "dbo".into(),
            kind: ConstraintKind::Check,
            columns: vec!["age".into()],
            check_expression: None,
            default_expression: None,
            source_column_type: None,
        };
        assert!(matches!(c.validate(), Err(SchemaModelError::CheckWithoutExpression { .. })));
    }

    #[test]
    fn default_requires_single_column() {
        let mut c = ConstraintSchema::default("df_created", "users", "dbo", "created_at", "GETDATE()", "datetime");
        c.columns.push("extra".into());
        assert!(matches!(c.validate(), Err(SchemaModelError::DefaultColumnCount { .. })));
    }

    #[test]
    fn unique_requires_columns() {
        let c = ConstraintSchema::unique("uq_email", "users", "dbo", vec![]);
        assert!(matches!(c.validate(), Err(SchemaModelError::UniqueWithoutColumns { .. })));
    }
}
