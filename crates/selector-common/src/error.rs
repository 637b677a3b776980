/// Error types shared by the selector crates.
///
/// These cover failures talking to the hosted catalog. Redis failures never
/// surface as errors: the cache degrades to a miss. Binaries define their own
/// error enums and wrap these via `#[from]`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("catalog returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("catalog returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("invalid catalog configuration: {0}")]
    Config(String),
}

impl CatalogError {
    /// Short message suitable for an API error body.
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
