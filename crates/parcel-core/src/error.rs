use thiserror::Error;

/// Why a domain operation refused or failed.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type OpResult<T> = Result<T, OpError>;

impl OpError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        OpError::Invalid(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        OpError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        OpError::Forbidden(msg.into())
    }
}
