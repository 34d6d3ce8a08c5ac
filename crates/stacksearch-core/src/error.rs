use thiserror::Error;

/// All the ways a workflow step can go wrong
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(#[from] stacksearch_api::ApiError),

    #[error("Cache operation failed: {0}")]
    CacheError(#[from] stacksearch_cache::CacheError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Fuzzy filter failed: {0}")]
    FilterError(String),

    #[error("Unusable site icon: {0}")]
    IconError(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Refusing to open {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Short name shown as the title of an error item
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ApiError(_) => "ApiError",
            Error::CacheError(_) => "CacheError",
            Error::ConfigError(_) => "ConfigError",
            Error::FilterError(_) => "FilterError",
            Error::IconError(_) => "IconError",
            Error::CommandFailed(_) => "CommandFailed",
            Error::InvalidUrl(_) => "InvalidUrl",
            Error::SerializationError(_) => "SerializationError",
            Error::IoError(_) => "IoError",
        }
    }
}
