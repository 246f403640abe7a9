//! Error taxonomy for the note store.
//!
//! Every failure the store can produce maps to exactly one [`Error`] variant so
//! callers can tell retryable faults (provider, I/O) from permanent ones
//! (validation, dimension mismatch) and from consistency faults that need repair.

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or empty caller input. No state was changed.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The embedding provider was unreachable, timed out, or returned malformed output.
    #[error("embedding provider failed: {message}")]
    Embedding { message: String, timed_out: bool },

    /// A vector's length differs from the collection's established dimension.
    #[error("dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The durable store could not be read or written. The operation was not applied.
    #[error("storage I/O failed: {message}")]
    Io { message: String },

    /// Repository and index disagree.
    #[error("repository/index consistency fault: {message}")]
    Consistency { message: String },

    /// One or more requested note ids do not exist.
    #[error("notes not found: {}", ids.join(", "))]
    NotFound { ids: Vec<String> },

    /// The collection holds no vectors to rank.
    #[error("collection '{collection}' is empty")]
    EmptyCollection { collection: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding { message: message.into(), timed_out: false }
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency { message: message.into() }
    }

    /// Stable snake_case name of the variant, used in wire error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Embedding { .. } => "embedding_error",
            Self::DimensionMismatch { .. } => "dimension_mismatch_error",
            Self::Io { .. } => "io_error",
            Self::Consistency { .. } => "consistency_error",
            Self::NotFound { .. } => "not_found_error",
            Self::EmptyCollection { .. } => "empty_collection_error",
        }
    }

    /// Whether retrying the same request unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Embedding { .. } | Self::Io { .. })
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Io { message: err.to_string() }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io { message: err.to_string() }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Io { message: format!("lock poisoned: {err}") }
    }
}
