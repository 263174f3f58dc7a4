//! Error types for alissa-review

use std::time::Duration;
use thiserror::Error;

use crate::models::VariantKind;

/// Result alias used throughout the crate
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Errors raised while talking to Alissa or maintaining the review store
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status from the API
    #[error("API error {status} on {endpoint}: {body}")]
    Http {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("Parse error on {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    /// Export never became ready within the poll bounds
    #[error(
        "Export {export_id} ({variant_kind}) for analysis {analysis_id} not ready after {attempts} attempts ({elapsed:?})"
    )]
    ExportTimedOut {
        analysis_id: u64,
        variant_kind: VariantKind,
        export_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Store header does not match the expected column list
    #[error("Schema mismatch in {path}: expected columns [{expected}], found [{found}]")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Store row that cannot be turned into a record
    #[error("Invalid row in {path} for '{reference}': {message}")]
    InvalidRow {
        path: String,
        reference: String,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] alissa_common::Error),
}

impl ReviewError {
    /// Whether this error means "export result not available yet"
    ///
    /// The export endpoint answers with an HTTP error status until the
    /// server has materialized the result.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ReviewError::Http { .. })
    }
}
