//! The schema value model.
//!
//! Every type here is produced wholesale by a schema reader and consumed
//! read-only downstream: there is no in-place mutation, only construction of
//! new values. A `TableSchema` that needs a renamed column is a new
//! `TableSchema`, not a mutated one.

mod column;
mod constraint;
mod foreign_key;
mod index;
mod table;
mod view;

pub use column::ColumnSchema;
pub use constraint::{ConstraintKind, ConstraintSchema};
pub use foreign_key::ForeignKeySchema;
pub use index::IndexSchema;
pub use table::TableSchema;
pub use view::ViewSchema;

/// Sentinel used in [`ColumnSchema::max_length`] to mean "unbounded" (e.g.
/// `VARCHAR(MAX)`, `TEXT`, `CLOB`).
pub const UNBOUNDED_LENGTH: i64 = -1;

/// Errors raised while constructing or validating schema values. These are
/// distinct from `migration_connector::ConnectorError`: they describe a
/// malformed schema model, not a failed database operation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaModelError {
    #[error("table `{table}` references unknown column `{column}` in its primary key")]
    DanglingPrimaryKeyColumn { table: String, column: String },
    #[error("table `{table}` references unknown local column `{column}` in foreign key `{constraint}`")]
    DanglingForeignKeyColumn {
        table: String,
        constraint: String,
        column: String,
    },
    #[error("identity column `{table}.{column}` must be declared non-nullable")]
    NullableIdentityColumn { table: String, column: String },
    #[error("CHECK constraint `{name}` on `{table}` has no check expression")]
    CheckWithoutExpression { table: String, name: String },
    #[error("DEFAULT constraint `{name}` on `{table}` must name exactly one column, found {count}")]
    DefaultColumnCount { table: String, name: String, count: usize },
    #[error("DEFAULT constraint `{name}` on `{table}` has no default expression")]
    DefaultWithoutExpression { table: String, name: String },
    #[error("UNIQUE constraint `{name}` on `{table}` names no columns")]
    UniqueWithoutColumns { table: String, name: String },
}

pub type SchemaModelResult<T> = Result<T, SchemaModelError>;
