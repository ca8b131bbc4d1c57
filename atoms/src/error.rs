use thiserror::Error;

/// Errors surfaced by the gallery pipelines and their adapters
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    /// No or invalid identity. Never retried.
    #[error("Unauthorized")]
    Unauthorized,

    /// Missing image/row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob upload/download/delete failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Metadata store read/write failure
    #[error("Metadata store error: {0}")]
    Metadata(String),

    /// Model call failure or schema-nonconformant response
    #[error("Inference error: {0}")]
    Inference(String),

    /// Rejected before any side effect (empty query, unsupported upload format)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another pipeline run already holds the image
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Deployment misconfiguration (e.g. embedding dimension mismatch)
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

impl GalleryError {
    /// HTTP status this error maps to at the API boundary
    pub fn status_code(&self) -> u16 {
        match self {
            GalleryError::Unauthorized => 401,
            GalleryError::NotFound(_) => 404,
            GalleryError::Validation(_) => 400,
            GalleryError::Conflict(_) => 409,
            GalleryError::Storage(_)
            | GalleryError::Metadata(_)
            | GalleryError::Inference(_)
            | GalleryError::Config(_) => 500,
        }
    }
}
