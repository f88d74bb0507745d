use std::io;
use std::result::Result as StdResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("API invalid data: {0}")]
    ApiInvalidData(String),
    #[error("API invalid format: {0}")]
    ApiInvalidFormat(String),
    #[error("API connection failed: {0}")]
    ApiConnectionFailed(String),
    #[error("API authentication failed: {0}")]
    ApiAuthFailed(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("API maintenance: {0}")]
    ApiMaintenance(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ApiInvalidFormat(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::InternalError(err.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
