use thiserror::Error;

/// Failure of a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
