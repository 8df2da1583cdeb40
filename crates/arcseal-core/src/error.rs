use thiserror::Error;

pub type ArcsealResult<T> = Result<T, ArcsealError>;

#[derive(Debug, Error)]
pub enum ArcsealError {
    #[error("config error: {0}")]
    Config(String),

    #[error("archive block JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
