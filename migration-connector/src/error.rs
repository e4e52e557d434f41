use thiserror::Error;

/// The error kinds from spec §7.
///
/// Every variant that names a failing database object carries its qualified
/// name so the orchestrator can log it per spec §7's "a failing run logs the
/// failing object, category, and the vendor's error text."
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("connection to {vendor} failed: {source}")]
    ConnectionFailed {
        vendor: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("identifier `{0}` is unsafe and was rejected before being interpolated into SQL")]
    UnsafeIdentifier(String),

    #[error("identifier is invalid: {0}")]
    InvalidIdentifier(String),

    #[error("failed to read schema for `{object}`: {message}")]
    SchemaReadFailed { object: String, message: String },

    #[error("no known mapping for source type `{source_type}` on {target}; fell back to the target's generic text type")]
    TypeMappingUnsupported { source_type: String, target: &'static str },

    #[error("DDL failed for `{object}` ({category}): {message}")]
    DdlFailed {
        object: String,
        category: &'static str,
        message: String,
    },

    #[error("bulk insert into `{table}` failed, batch rolled back: {message}")]
    BulkInsertFailed { table: String, message: String },

    #[error("failed to reset sequence for `{table}`: {message}")]
    SequenceResetFailed { table: String, message: String },

    #[error("failed to toggle constraints ({action}): {message}")]
    ConstraintToggleFailed { action: &'static str, message: String },

    #[error("migration run was cancelled")]
    Cancelled,
}

impl ConnectorError {
    /// `true` for the kinds spec §7 marks fatal regardless of
    /// `continue-on-error` (configuration and connection failures).
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, ConnectorError::InvalidConfiguration(_) | ConnectorError::ConnectionFailed { .. } | ConnectorError::Cancelled)
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
