//! Captures statements instead of executing them, for dry-run mode (spec
//! §4.6). Append-only and safe for the configured data-phase worker count: a
//! `Mutex` around the append is all concurrent table workers need.

use migration_connector::{CapturedStatement, DryRunResult, StatementCategory};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct SqlCollector {
    statements: Mutex<Vec<CapturedStatement>>,
    sequence: std::sync::atomic::AtomicU64,
}

impl SqlCollector {
    pub fn new() -> Self {
        SqlCollector::default()
    }

    pub fn capture(&self, sql: impl Into<String>, category: StatementCategory, object_name: Option<String>) {
        let sequence = self.sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let statement = CapturedStatement {
            sql: sql.into(),
            category,
            object_name,
            sequence,
        };
        self.statements.lock().expect("collector mutex poisoned").push(statement);
    }

    /// Emits a `-- === <phase> ===` header, when comments are enabled.
    pub fn emit_phase_header(&self, phase_name: &str, emit_comments: bool) {
        if emit_comments {
            self.capture(format!("-- === {phase_name} ==="), StatementCategory::Comment, None);
        }
    }

    pub fn get_script(&self) -> String {
        let statements = self.statements.lock().expect("collector mutex poisoned");
        let mut out = String::new();
        for statement in statements.iter() {
            out.push_str(&statement.sql);
            out.push('\n');
        }
        out
    }

    pub fn clear(&self) {
        self.statements.lock().expect("collector mutex poisoned").clear();
    }

    pub fn into_dry_run_result(self) -> DryRunResult {
        let mut statements = self.statements.into_inner().expect("collector mutex poisoned");
        statements.sort_by_key(|s| s.sequence);
        DryRunResult::new(statements)
    }

    /// Same as [`Self::into_dry_run_result`] but through a shared reference,
    /// for callers holding the collector behind an `Arc` alongside the
    /// target flavour that writes into it.
    pub fn to_dry_run_result(&self) -> DryRunResult {
        let mut statements = self.statements.lock().expect("collector mutex poisoned").clone();
        statements.sort_by_key(|s| s.sequence);
        DryRunResult::new(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_statements_in_order_with_category() {
        let collector = SqlCollector::new();
        collector.emit_phase_header("Tables", true);
        collector.capture("CREATE TABLE users (id INT)", StatementCategory::Tables, Some("users".to_string()));
        collector.capture("CREATE TABLE orders (id INT)", StatementCategory::Tables, Some("orders".to_string()));

        let result = collector.into_dry_run_result();
        assert_eq!(result.total_statements(), 2);
        assert_eq!(result.statements[0].category, StatementCategory::Comment);
    }

    #[test]
    fn clear_resets_the_buffer() {
        let collector = SqlCollector::new();
        collector.capture("CREATE TABLE users (id INT)", StatementCategory::Tables, None);
        collector.clear();
        assert_eq!(collector.into_dry_run_result().total_statements(), 0);
    }
}
