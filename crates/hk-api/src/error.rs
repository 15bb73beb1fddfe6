//! Error type shared by every API operation.

use thiserror::Error;

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No credential was configured. Raised before any network activity.
    #[error("Missing HAKUNA_TOKEN")]
    MissingToken,
    /// The credential cannot be sent as an HTTP header value.
    #[error("HAKUNA_TOKEN contains characters not allowed in an HTTP header")]
    InvalidToken,
    /// The configured base URL or a request path did not form a valid URL.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed before a status was received.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The API answered with a status of 400 or above.
    ///
    /// `body` is the raw response text; it is not parsed.
    #[error("Hakuna {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// A successful response did not carry JSON.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// The HTTP status of an upstream failure.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}
