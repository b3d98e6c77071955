use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to a remote manifest endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// A manifest body that could not be turned into a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog manifest: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("catalog manifest contains no templates")]
    Empty,
}

/// Early-terminating failures at the request boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("The link you followed has expired.")]
    InvalidNonce,

    #[error("You do not have permission to import a demo.")]
    PermissionDenied,
}

impl RequestError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::InvalidNonce => "invalid_nonce",
            RequestError::PermissionDenied => "permission_denied",
        }
    }
}
