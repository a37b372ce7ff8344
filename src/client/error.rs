use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Validation(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
