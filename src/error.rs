use thiserror::Error;

/// Main error type for krill operations
///
/// Compilation errors are fatal to a single translation call and are never
/// retried; they always carry the offending expression's textual form.
/// Execution errors are retried by the repository layer up to a configured
/// count before becoming terminal.
#[derive(Error, Debug)]
pub enum KrillError {
    #[error("unsupported expression node {kind}: {expression}")]
    UnsupportedNode {
        kind: &'static str,
        expression: String,
    },

    #[error("method '{method}' is not supported: {expression}")]
    UnsupportedMethod { method: String, expression: String },

    #[error("cannot translate a query between '{left}' and '{right}'")]
    UnsupportedOperands { left: String, right: String },

    #[error("cannot resolve field for '{expression}': {reason}")]
    FieldResolution { expression: String, reason: String },

    #[error("cannot use {0} as a range bound")]
    InvalidRangeBound(String),

    #[error("order_by and order_by_desc cannot be used together")]
    ConflictingSort,

    #[error("failed to evaluate closed expression: {0}")]
    Evaluation(String),

    #[error("invalid continuation token: {0}")]
    InvalidToken(String),

    #[error("document already exists")]
    DocumentConflict,

    #[error("backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("search backend error: {0}")]
    Backend(String),

    #[error("cluster unavailable (index: {index}): {message}")]
    ClusterUnavailable {
        index: String,
        message: String,
        /// Serialized outgoing request body, kept for postmortem.
        request: String,
    },

    #[error("execution failed: {message}")]
    Execution { message: String, request: String },

    #[error("{failed} of {total} batches failed")]
    PartialBatch { failed: usize, total: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for krill operations
pub type Result<T> = std::result::Result<T, KrillError>;

impl KrillError {
    /// Check if this error was produced while compiling a predicate
    ///
    /// Compilation errors surface synchronously and block the request.
    pub fn is_compilation(&self) -> bool {
        matches!(
            self,
            KrillError::UnsupportedNode { .. }
                | KrillError::UnsupportedMethod { .. }
                | KrillError::UnsupportedOperands { .. }
                | KrillError::FieldResolution { .. }
                | KrillError::InvalidRangeBound(_)
                | KrillError::ConflictingSort
                | KrillError::Evaluation(_)
        )
    }

    /// Check if this error indicates a transient failure worth retrying
    pub fn is_retriable(&self) -> bool {
        matches!(self, KrillError::Backend(_) | KrillError::Http { .. })
    }
}
