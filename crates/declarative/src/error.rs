//! Error types for planning and reconciliation.
//!
//! Errors are categorized so callers can tell schema problems (detected
//! before any remote call) apart from remote failures and from the one
//! fatal class, an inconsistent state, which needs operator attention.

use crate::value::AttributePath;
use thiserror::Error;

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration or state does not match the schema
    Schema,
    /// The remote resource does not exist
    NotFound,
    /// The remote rejected or failed the request
    Remote,
    /// The operation was cancelled before any side effect
    Cancelled,
    /// The remote outcome is unknown
    Consistency,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether the error must be surfaced for operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Consistency)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Schema => "Invalid configuration",
            Self::NotFound => "Resource not found",
            Self::Remote => "Remote request failed",
            Self::Cancelled => "Operation cancelled",
            Self::Consistency => "Inconsistent state",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Schema => "Fix the reported attributes and plan again",
            Self::NotFound => "Check the resource id, or refresh state to drop vanished resources",
            Self::Remote => "Check the remote service and retry",
            Self::Cancelled => "No changes were made; run the operation again",
            Self::Consistency => {
                "Inspect the remote resource, then import it or remove it by hand before retrying"
            }
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while planning or reconciling resources.
#[derive(Debug, Error)]
pub enum Error {
    /// No schema is registered for the kind
    #[error("unknown resource kind: {kind}")]
    UnknownResourceKind {
        /// The kind that was looked up
        kind: String,
    },

    /// A registered schema is malformed
    #[error("invalid schema for {kind}: {reason}")]
    InvalidSchema { kind: String, reason: String },

    /// A required attribute has no value
    #[error("missing required attribute: {path}")]
    MissingRequiredAttribute { path: AttributePath },

    /// A value is of the wrong type or not allowed at this path
    #[error("invalid value for {path}: {reason}")]
    InvalidAttributeValue { path: AttributePath, reason: String },

    /// A typed conversion found a different variant than requested
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: AttributePath,
        expected: &'static str,
        found: &'static str,
    },

    /// A resource address could not be parsed
    #[error("invalid resource address '{0}': expected kind.name")]
    InvalidAddress(String),

    /// The remote has no resource with this id
    #[error("{kind} {id} not found")]
    RemoteNotFound { kind: String, id: String },

    /// A resource with a colliding identity already exists
    #[error("{kind} conflict: {message}")]
    RemoteConflict { kind: String, message: String },

    /// The remote refused a field of the request
    #[error("{kind} rejected {field}: {message}")]
    RemoteRejected {
        kind: String,
        field: String,
        message: String,
    },

    /// The remote failed to process the request
    #[error("{kind} server error: {message}")]
    RemoteServerError { kind: String, message: String },

    /// Cancelled before any remote side effect
    #[error("operation cancelled")]
    Cancelled,

    /// The remote outcome of an operation cannot be determined
    #[error("inconsistent state for {kind}{}: {message}", .id.as_deref().map(|id| format!(" {id}")).unwrap_or_default())]
    InconsistentState {
        kind: String,
        id: Option<String>,
        message: String,
    },

    /// Several independent errors found in one pass
    #[error("{}", format_multiple(.0))]
    Multiple(Vec<Error>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

fn format_multiple(errors: &[Error]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
    format!("{} errors:\n{}", errors.len(), lines.join("\n"))
}

impl Error {
    /// Shorthand for an [`Error::InvalidAttributeValue`].
    pub fn invalid(path: &AttributePath, reason: impl Into<String>) -> Self {
        Self::InvalidAttributeValue {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Fold a list of errors into one.
    ///
    /// A single error is returned bare; returns `None` for an empty list.
    pub fn collect(mut errors: Vec<Error>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Iterate over the individual errors, flattening [`Error::Multiple`].
    pub fn causes(&self) -> Vec<&Error> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Error::causes).collect(),
            other => vec![other],
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownResourceKind { .. }
            | Error::InvalidSchema { .. }
            | Error::MissingRequiredAttribute { .. }
            | Error::InvalidAttributeValue { .. }
            | Error::TypeMismatch { .. }
            | Error::InvalidAddress(_) => ErrorCategory::Schema,
            Error::RemoteNotFound { .. } => ErrorCategory::NotFound,
            Error::RemoteConflict { .. }
            | Error::RemoteRejected { .. }
            | Error::RemoteServerError { .. } => ErrorCategory::Remote,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::InconsistentState { .. } => ErrorCategory::Consistency,
            Error::Multiple(errors) => errors
                .iter()
                .map(Error::category)
                .find(ErrorCategory::is_fatal)
                .or_else(|| errors.first().map(Error::category))
                .unwrap_or(ErrorCategory::Other),
            Error::Io(_) | Error::Json(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error must not be retried without operator intervention.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Whether this error is a [`Error::RemoteNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteNotFound { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
