use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MemoStoreResult<T> = Result<T, MemoStoreError>;
