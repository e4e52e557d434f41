use serde::{Deserialize, Serialize};

/// A view, as read from the source catalog. `definition` is the raw
/// `SELECT` text the source vendor reports; it is rewritten by the dialect
/// translator before being handed to a target writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSchema {
    pub name: String,
    pub schema: String,
    pub definition: String,
    pub columns: Option<Vec<String>>,
}

impl ViewSchema {
    pub fn new(name: impl Into<String>, schema: impl Into<String>, definition: impl Into<String>) -> Self {
        ViewSchema {
            name: name.into(),
            schema: schema.into(),
            definition: definition.into(),
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}
