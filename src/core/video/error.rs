use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Stream not opened: {0}")]
    NotOpened(String),
    #[error("Stream already released")]
    Released,
    #[error("Frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
    #[error("Unsupported frame format: {0}")]
    UnsupportedFormat(String),
    #[error("Video backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for VideoError {
    fn from(err: opencv::Error) -> Self {
        VideoError::Backend(err.to_string())
    }
}
