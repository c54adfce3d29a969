use thiserror::Error;

/// Failure taxonomy of the enrollment and grade lifecycle.
#[derive(Debug, Error)]
pub(crate) enum RecordsError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    DuplicateAssignment(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RecordsError {
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable name, used in failure bodies and metrics labels.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            RecordsError::NotFound(_) => "not_found",
            RecordsError::Validation(_) => "validation",
            RecordsError::DuplicateAssignment(_) => "duplicate_assignment",
            RecordsError::Storage(_) => "storage",
            RecordsError::Database(_) => "internal",
        }
    }
}
