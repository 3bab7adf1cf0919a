use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Couldn't create the output directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't generate the request token for page {page}: {reason}")]
    TokenGeneration { page: u32, reason: String },

    #[error("Network Error: {0}")]
    TransientNetwork(reqwest::Error),
    #[error("HTTP Status {status}. Response Body Snippet: {snippet}")]
    HttpStatus { status: u16, snippet: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Unexpected Error: {0}")]
    Unexpected(String),
    #[error("Config Error: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// 401, 403 and 429 usually mean the token went stale or we are being rate limited.
    pub fn is_auth_or_rate_limit(&self) -> bool {
        matches!(self, Error::HttpStatus { status: 401 | 403 | 429, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() || value.is_connect() || value.is_request() {
            Error::TransientNetwork(value)
        } else {
            Error::Unexpected(value.to_string())
        }
    }
}
