use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the SetBit SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the SetBit SDK.
///
/// Only configuration and authentication errors are ever returned from construction. Flag
/// evaluation and event tracking never surface errors: they are logged and converted to the
/// caller's default at the [`Client`](crate::Client) boundary.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The API key is missing or empty.
    #[error("api_key is required")]
    MissingApiKey,

    /// The configured base URL cannot be parsed.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The server rejected the API key.
    #[error("unauthorized, api_key is likely invalid")]
    Unauthorized,

    /// The requested flag is not present in the loaded flag set.
    #[error("flag not found")]
    FlagNotFound,

    /// The flag definition received from the server could not be parsed.
    #[error("error parsing flag definition, try upgrading SetBit SDK")]
    FlagParseError,

    /// The server responded with an unexpected (non-2xx, non-401) status code.
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(u16),

    /// Network error, including timeouts.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),

    /// Error serializing or deserializing a payload.
    #[error(transparent)]
    Serialization(Arc<serde_json::Error>),

    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    /// An I/O error.
    #[error(transparent)]
    Io(Arc<std::io::Error>),

    /// The poller thread panicked. This should normally never happen.
    #[error("poller thread panicked")]
    PollerThreadPanicked,
}

impl Error {
    /// Returns `true` if the error was caused by talking to the server (as opposed to
    /// configuration or flag-definition problems).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedStatus(_) | Error::Network(_) | Error::Serialization(_) | Error::Io(_)
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        // Strip the URL so request query parameters never end up in logs.
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(value))
    }
}
