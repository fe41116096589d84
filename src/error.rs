//! Error types for Trueno-Metrics
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! A cache miss is NOT an error: `load()` on an absent key returns the
//! metric's default value. Corrupt on-disk values are always surfaced.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Metrics error types
#[derive(Error, Debug)]
pub enum Error {
    /// No metric kind registered under this identifier
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// A metric kind with this identifier is already registered
    #[error("Duplicate metric: {0} is already registered")]
    DuplicateMetric(String),

    /// Metric identifier cannot serve as a storage directory name
    #[error("Invalid metric identifier {0:?}: must be one non-empty path component without separators")]
    InvalidIdentifier(String),

    /// Wrong number (or set) of key parameters for a metric kind
    #[error("Parameter arity mismatch for {metric}: expected {expected}, got {actual}")]
    ParameterArityMismatch {
        /// Metric identifier
        metric: String,
        /// Schema-declared parameters
        expected: String,
        /// What the caller supplied
        actual: String,
    },

    /// A parameter value cannot be coerced to its schema type
    #[error("Parameter type error: {parameter}={value}: {reason}")]
    ParameterTypeError {
        /// Parameter name (e.g. `TO_DATE`)
        parameter: String,
        /// Offending value
        value: String,
        /// Why the coercion failed
        reason: String,
    },

    /// Stored value cannot be parsed as the metric's declared shape
    #[error("Corrupt value at {path}: {reason}\nRemove the file to force recomputation.")]
    CorruptValue {
        /// Location of the unparseable value
        path: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Malformed record in an event log
    #[error("Event log error at line {line}: {reason}")]
    EventLog {
        /// 1-based line number
        line: usize,
        /// Parser diagnostic
        reason: String,
    },

    /// IO error (storage layer could not read or write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
