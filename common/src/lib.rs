use thiserror::Error;
use url::ParseError;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] rquest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid date range: {0}")]
    InvalidDate(String),

    #[error("Evocon API returned status {status} for resource '{resource}'")]
    Api { status: u16, resource: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden - Access denied")]
    Forbidden,

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transient failures are worth retrying; everything else aborts the run.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimit => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidInput(format!("URL parse error: {}", err))
    }
}
