use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Fruit with ID: '{0}' not found")]
    NotFound(String),
    #[error("ID is duplicated, try again")]
    DuplicateId(String),
    #[error("service is shutting down, try again later")]
    Closed,
    #[error("id generation failed: {0}")]
    IdGeneration(String),
    #[error("snapshot {op} failed for '{path}': {reason}")]
    Persistence {
        op: &'static str,
        path: String,
        reason: String,
    },
}

impl ServiceError {
    pub fn persistence(op: &'static str, path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Persistence { op, path: path.display().to_string(), reason: reason.to_string() }
    }
}
