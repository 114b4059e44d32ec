use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid run id: {0:?}")]
    InvalidRunId(String),

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
