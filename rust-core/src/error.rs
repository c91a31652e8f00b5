use thiserror::Error;

/// Failure to encode or decode a wire frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A mutation the media player refused to perform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// Seek target outside what the media can accept (negative, infinite).
    #[error("seek target out of range: {0}")]
    OutOfRange(f64),

    /// Media not seekable yet because metadata has not loaded.
    #[error("media metadata not loaded")]
    NotReady,

    /// Play requested with no media source loaded.
    #[error("no media source loaded")]
    NoSource,
}
