//! Failure taxonomy of a resize request and the HTTP status each one maps to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("object not found: {key}")]
    ObjectNotFound { key: String },

    #[error("unable to decode image: {0}")]
    Decode(String),

    #[error("unsupported dimensions: {0}")]
    UnsupportedDimensions(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("unable to store image: {0}")]
    StorageWrite(String),

    /// The store stopped consuming the encoder output, the writer error is the real cause
    #[error("output stream closed")]
    OutputClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResizeError {
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MalformedKey(_) | Self::UnsupportedDimensions(_) => 400,
            Self::ObjectNotFound { .. } => 404,
            Self::Decode(_) => 422,
            Self::StorageUnavailable(_) => 502,
            Self::StorageWrite(_) | Self::OutputClosed | Self::Internal(_) => 500,
        }
    }

    /// Client faults are logged at `warn`, everything else at `error`
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status_code(), 400..=499)
    }
}

pub type Result<T, E = ResizeError> = std::result::Result<T, E>;
