use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Model not configured: {0}")]
    NotConfigured(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
