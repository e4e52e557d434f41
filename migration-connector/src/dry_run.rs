use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The category a captured dry-run statement belongs to, one per phase plus
/// `Comment` for the `-- === <phase> ===` headers (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatementCategory {
    Schema,
    Tables,
    Data,
    Indexes,
    Constraints,
    ForeignKeys,
    Views,
    Comment,
}

impl StatementCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementCategory::Schema => "Schema",
            StatementCategory::Tables => "Tables",
            StatementCategory::Data => "Data",
            StatementCategory::Indexes => "Indexes",
            StatementCategory::Constraints => "Constraints",
            StatementCategory::ForeignKeys => "ForeignKeys",
            StatementCategory::Views => "Views",
            StatementCategory::Comment => "Comment",
        }
    }
}

/// One statement captured while routed through the SQL collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedStatement {
    pub sql: String,
    pub category: StatementCategory,
    pub object_name: Option<String>,
    /// Milliseconds since the collector was created. A real wall-clock
    /// timestamp would make golden-script tests non-deterministic; this is
    /// the collector's own logical clock instead.
    pub sequence: u64,
}

/// The result of a dry run: everything a live run would have executed,
/// captured instead of applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryRunResult {
    pub statements: Vec<CapturedStatement>,
    pub output_path: Option<String>,
}

impl DryRunResult {
    pub fn new(statements: Vec<CapturedStatement>) -> Self {
        DryRunResult {
            statements,
            output_path: None,
        }
    }

    /// The full script text, statements in capture order, one per line.
    pub fn script(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            out.push_str(&statement.sql);
            out.push('\n');
        }
        out
    }

    /// Per-category statement counts.
    pub fn counts_by_category(&self) -> BTreeMap<StatementCategory, usize> {
        let mut counts = BTreeMap::new();
        for statement in &self.statements {
            *counts.entry(statement.category).or_insert(0) += 1;
        }
        counts
    }

    /// `sum(category counts) - Comment count`, the "TotalStatements"
    /// invariant from spec §8.
    pub fn total_statements(&self) -> usize {
        self.statements.iter().filter(|s| s.category != StatementCategory::Comment).count()
    }

    /// Writes [`Self::script`] to `path`, recording the path on the result.
    /// The only artifact a dry run is allowed to write to disk (spec §6).
    pub fn write_to_path(&mut self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.script())?;
        self.output_path = Some(path.display().to_string());
        Ok(())
    }

    /// A machine-readable rendering alongside [`Self::script`]'s plain SQL,
    /// for callers that want per-statement category/object metadata rather
    /// than just the concatenated text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stmt(sql: &str, category: StatementCategory, sequence: u64) -> CapturedStatement {
        CapturedStatement {
            sql: sql.to_string(),
            category,
            object_name: None,
            sequence,
        }
    }

    #[test]
    fn total_statements_excludes_comments() {
        let result = DryRunResult::new(vec![
            stmt("-- === Tables ===", StatementCategory::Comment, 0),
            stmt("CREATE TABLE users (id INT)", StatementCategory::Tables, 1),
            stmt("CREATE TABLE orders (id INT)", StatementCategory::Tables, 2),
        ]);
        assert_eq!(result.total_statements(), 2);
        assert_eq!(result.counts_by_category()[&StatementCategory::Tables], 2);
    }

    #[test]
    fn to_json_round_trips_through_serde_json() {
        let result = DryRunResult::new(vec![stmt("CREATE TABLE users (id INT)", StatementCategory::Tables, 0)]);
        let json = result.to_json().unwrap();
        let parsed: DryRunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].category, StatementCategory::Tables);
    }
}
