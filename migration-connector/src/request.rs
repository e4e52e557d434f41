use crate::{ConnectorError, NamingConvention, Vendor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-phase opt-out flags (spec §4.8). All default to `true`: a request
/// that doesn't touch this struct migrates everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFlags {
    pub migrate_schema: bool,
    pub migrate_data: bool,
    pub migrate_indexes: bool,
    pub migrate_constraints: bool,
    pub migrate_views: bool,
    pub migrate_foreign_keys: bool,
}

impl Default for PhaseFlags {
    fn default() -> Self {
        PhaseFlags {
            migrate_schema: true,
            migrate_data: true,
            migrate_indexes: true,
            migrate_constraints: true,
            migrate_views: true,
            migrate_foreign_keys: true,
        }
    }
}

/// Dry-run specific settings (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryRunSettings {
    pub enabled: bool,
    pub output_path: Option<String>,
    pub emit_comments: bool,
    /// Up to this many literal sample `INSERT` rows per table; `0` disables
    /// sampling entirely.
    pub sample_row_count: u32,
}

/// Everything `execute` needs to run (or dry-run) one migration (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub source_vendor: Vendor,
    pub target_vendor: Vendor,
    pub source_connection_string: String,
    pub target_connection_string: String,
    pub target_schema: String,
    pub include_tables: HashSet<String>,
    pub exclude_tables: HashSet<String>,
    pub batch_size: u32,
    pub naming_convention: NamingConvention,
    pub max_identifier_length: Option<usize>,
    pub phases: PhaseFlags,
    pub continue_on_error: bool,
    pub dry_run: DryRunSettings,
    /// Table-level worker count for the data phase (spec §5). `1` means
    /// sequential table-by-table migration.
    pub data_phase_workers: u32,
}

impl MigrationRequest {
    pub fn new(source_vendor: Vendor, source_connection_string: impl Into<String>, target_vendor: Vendor, target_connection_string: impl Into<String>, target_schema: impl Into<String>) -> Self {
        MigrationRequest {
            source_vendor,
            target_vendor,
            source_connection_string: source_connection_string.into(),
            target_connection_string: target_connection_string.into(),
            target_schema: target_schema.into(),
            include_tables: HashSet::new(),
            exclude_tables: HashSet::new(),
            batch_size: 1000,
            naming_convention: NamingConvention::Auto,
            max_identifier_length: None,
            phases: PhaseFlags::default(),
            continue_on_error: false,
            dry_run: DryRunSettings::default(),
            data_phase_workers: 1,
        }
    }

    pub fn effective_max_identifier_length(&self) -> usize {
        self.max_identifier_length.unwrap_or_else(|| self.target_vendor.default_max_identifier_length())
    }

    /// Validates the request per spec §6: "Validation rejects missing
    /// connection strings, missing vendors, and unknown vendor strings with
    /// a combined error listing every violation." `Vendor` is already a
    /// closed enum by the time a request reaches this type, so "missing /
    /// unknown vendor" is enforced by the front-end's parse step (documented
    /// on [`Vendor::from_str`](crate::Vendor)); this only re-validates what
    /// the type system cannot.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        let mut violations = Vec::new();

        if self.source_connection_string.trim().is_empty() {
            violations.push("source connection string is missing".to_string());
        } else {
            validate_connection_string(self.source_vendor, &self.source_connection_string, "source", &mut violations);
        }
        if self.target_connection_string.trim().is_empty() {
            violations.push("target connection string is missing".to_string());
        } else {
            validate_connection_string(self.target_vendor, &self.target_connection_string, "target", &mut violations);
        }
        if self.target_schema.trim().is_empty() {
            violations.push("target schema name is missing".to_string());
        }
        if self.batch_size == 0 {
            violations.push("batch size must be greater than zero".to_string());
        }
        if !self.include_tables.is_empty() && !self.exclude_tables.is_empty() {
            let overlap: Vec<&String> = self.include_tables.intersection(&self.exclude_tables).collect();
            if !overlap.is_empty() {
                violations.push(format!("tables listed in both include and exclude: {overlap:?}"));
            }
        }
        if self.dry_run.enabled {
            if let Some(path) = &self.dry_run.output_path {
                if path.trim().is_empty() {
                    violations.push("dry-run output path is set but empty".to_string());
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConnectorError::InvalidConfiguration(violations.join("; ")))
        }
    }
}

/// `quaint`'s three backends take a URL (`postgresql://`, `mysql://`,
/// `sqlserver://`); Oracle's `user/password@connect_string` form isn't one,
/// so only the URL-shaped vendors get parsed here.
fn validate_connection_string(vendor: Vendor, connection_string: &str, role: &str, violations: &mut Vec<String>) {
    if vendor == Vendor::Oracle {
        return;
    }
    if let Err(e) = url::Url::parse(connection_string) {
        violations.push(format!("{role} connection string is not a valid URL: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_request() -> MigrationRequest {
        MigrationRequest::new(Vendor::SqlServer, "mssql://localhost", Vendor::Postgres, "postgres://localhost", "public")
    }

    #[test]
    fn valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn rejects_non_url_connection_string_for_url_shaped_vendors() {
        let mut request = base_request();
        request.source_connection_string = "not a url".to_string();
        assert!(request.validate().unwrap_err().to_string().contains("source connection string is not a valid URL"));
    }

    #[test]
    fn oracle_connection_string_skips_url_validation() {
        let mut request = base_request();
        request.source_vendor = Vendor::Oracle;
        request.source_connection_string = "scott/tiger@localhost:1521/orclpdb1".to_string();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn combines_multiple_violations() {
        let mut request = base_request();
        request.source_connection_string.clear();
        request.target_connection_string.clear();
        request.batch_size = 0;

        let err = request.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("source connection string"));
        assert!(message.contains("target connection string"));
        assert!(message.contains("batch size"));
    }
}
