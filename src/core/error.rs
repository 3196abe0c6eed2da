use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid record identifier: {0}")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Codec error: {0}")]
    CodecError(String),

    #[error("Corrupted data file: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Whether the failure was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidId(_))
    }
}
