use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the network side of the controller.
///
/// None of these ever reach the table: the controller logs them and leaves
/// whatever is displayed as it was.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} answered with status {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    #[error("could not decode {endpoint} payload: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid api url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ControllerError>;
