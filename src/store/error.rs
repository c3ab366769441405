use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid store path: {0}")]
    InvalidPath(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Subscription cancelled: {0}")]
    Cancelled(String),

    #[error("Subscription stream closed")]
    Disconnected,

    #[error("Store unavailable")]
    Unavailable,
}
