use thiserror::Error;

#[derive(Debug, Error)]
pub enum OncomapError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Security error: {0}")]
    Security(String),
}

pub type Result<T> = std::result::Result<T, OncomapError>;
