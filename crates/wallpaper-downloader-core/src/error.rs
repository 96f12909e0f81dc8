use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the wallpaper-downloader library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection, timeout or malformed URL while talking HTTP
    #[error("Transport error: {0}")]
    Transport(String),

    /// Neither name nor image-URL pattern matched
    #[error("No pattern matched: {0}")]
    NoMatch(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The settings page produced no endpoints
    #[error("Downloader not initialized: no endpoints were enumerated")]
    NotInitialized,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
