use crate::cache::CacheError;
use crate::render_request::invalid_request_error::InvalidRequestError;
use strum_macros::{AsRefStr, Display};

/// Classification of [`Error`], e.g. for mapping to transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequest,
    CacheUnavailable,
    UpstreamFailure,
    InvalidConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequestError),
    #[error(transparent)]
    CacheUnavailable(CacheError),
    #[error("rendering failed: {0}")]
    UpstreamFailure(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            Error::UpstreamFailure(_) => ErrorKind::UpstreamFailure,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Error::CacheUnavailable(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidConfig(format!("renderer url: {}", err))
    }
}
