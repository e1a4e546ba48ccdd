use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),

    #[error("Invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("Invalid completed value: {0}")]
    InvalidCompleted(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid skip: {0}")]
    InvalidSkip(String),
}

impl FilterError {
    /// Query parameter the error is attributed to.
    pub fn field(&self) -> &'static str {
        match self {
            FilterError::InvalidSortField(_) | FilterError::InvalidSortDirection(_) => "sortBy",
            FilterError::InvalidCompleted(_) => "completed",
            FilterError::InvalidLimit(_) => "limit",
            FilterError::InvalidSkip(_) => "skip",
        }
    }
}
