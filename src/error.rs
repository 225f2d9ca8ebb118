use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("incomplete row: expected 5 fields, found {found}")]
    IncompleteRow { found: usize },
    #[error("invalid date `{value}`: expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("row {index}: {source}")]
    Row {
        index: usize,
        #[source]
        source: RowError,
    },
    #[error("no snapshot precedes {filename}")]
    NoPredecessor { filename: String },
    #[error("snapshot not found: {path}")]
    NotFound { path: String },
    #[error("snapshot {path} is unreadable: {reason}")]
    CorruptSnapshot { path: String, reason: String },
    #[error("failed to persist snapshot {path}: {reason}")]
    PersistenceFailure { path: String, reason: String },
    #[error("summarization unavailable: {0}")]
    SummarizationUnavailable(String),
}

impl MetricsError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Row { source, .. } => match source {
                RowError::IncompleteRow { .. } => "INCOMPLETE_ROW",
                RowError::InvalidDate { .. } => "INVALID_DATE",
            },
            Self::NoPredecessor { .. } => "NO_PREDECESSOR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::CorruptSnapshot { .. } => "CORRUPT_SNAPSHOT",
            Self::PersistenceFailure { .. } => "PERSISTENCE_FAILURE",
            Self::SummarizationUnavailable(_) => "SUMMARIZATION_UNAVAILABLE",
        }
    }
}
