use serde::{Deserialize, Serialize};

/// Selector for the identifier converter (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Use the target vendor's canonical convention.
    #[default]
    Auto,
    SnakeCase,
    PascalCase,
    Lowercase,
    Uppercase,
    /// Return every identifier verbatim.
    Preserve,
}
