use thiserror::Error;

/// Errors produced by the CAS client.
#[derive(Debug, Error)]
pub enum CasError {
    #[error("invalid CAS server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported CAS server URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("ticket validation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("CAS rejected the ticket: {code}: {description}")]
    Rejected { code: String, description: String },

    #[error("malformed CAS validation response")]
    MalformedResponse,
}
