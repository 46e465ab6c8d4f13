//! Fatal error type shared by every formsieve crate.
//!
//! Validation failures are never reported through this type; they live in the
//! [`ErrorBag`](crate::ErrorBag). A `SieveError` always means the engine was
//! misconfigured or misused.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieveError {
    /// Operation not allowed in the current state (double execute, double error set).
    #[error("State error: {0}")]
    State(String),

    #[error("No data source was supplied")]
    MissingDataSource,

    #[error("No validation rules were supplied")]
    MissingRules,

    /// A file field was declared but no files source exists.
    #[error("Field '{0}' expects a file but no files source was supplied")]
    MissingFilesSource(String),

    #[error("Unknown data type: {0}")]
    UnknownType(String),

    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File error: {0}")]
    File(String),

    /// Lookup of a field that was never validated.
    #[error("Field '{0}' was not validated")]
    UnknownField(String),

    #[error("Hook error: {0}")]
    Hook(String),
}

impl SieveError {
    /// Short machine readable identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SieveError::State(_) => "state",
            SieveError::MissingDataSource => "missing_data_source",
            SieveError::MissingRules => "missing_rules",
            SieveError::MissingFilesSource(_) => "missing_files_source",
            SieveError::UnknownType(_) => "unknown_type",
            SieveError::InvalidRules(_) => "invalid_rules",
            SieveError::Config(_) => "config",
            SieveError::File(_) => "file",
            SieveError::UnknownField(_) => "unknown_field",
            SieveError::Hook(_) => "hook",
        }
    }
}

impl From<serde_json::Error> for SieveError {
    fn from(err: serde_json::Error) -> Self {
        SieveError::InvalidRules(err.to_string())
    }
}

pub type Result<T, E = SieveError> = std::result::Result<T, E>;
