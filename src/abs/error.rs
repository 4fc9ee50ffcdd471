use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single API call
#[derive(Debug, Error)]
pub enum AbsError {
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned status {status}")]
    Status { path: String, status: StatusCode },

    #[error("failed to parse response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered 200 but flagged an error in the body
    #[error("{path} reported an error: {message}")]
    Api { path: String, message: String },
}
