use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Profile API unreachable: {0}")]
    Unreachable(String),

    #[error("Profile API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
