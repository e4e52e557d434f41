use serde::{Deserialize, Serialize};

/// A single cell value moving between a data reader and a data writer.
///
/// This is the vendor-neutral value representation the core works with;
/// each flavour's data writer is responsible for coercing it into whatever
/// its driver crate wants on the way out (spec §4.7's "value coercions ...
/// are the writer's responsibility").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Arbitrary-precision decimal, kept as its canonical string form to
    /// avoid lossy float round-tripping.
    Decimal(String),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(chrono::DateTime<chrono::Utc>),
    Uuid(uuid::Uuid),
}

/// One row, with values in the same order as the originating
/// [`sql_schema_describer::TableSchema`]'s columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Row(pub Vec<RowValue>);

impl Row {
    pub fn new(values: Vec<RowValue>) -> Self {
        Row(values)
    }
}

impl std::ops::Index<usize> for Row {
    type Output = RowValue;

    fn index(&self, index: usize) -> &RowValue {
        &self.0[index]
    }
}
