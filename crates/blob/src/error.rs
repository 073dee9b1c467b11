use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The identifier is not a canonical asset id.
    #[error("invalid asset id: {0:?}")]
    InvalidId(String),

    /// The blob exceeds the maximum allowed size.
    #[error("blob too large: more than {limit} bytes")]
    CapacityExceeded {
        /// Maximum allowed size in bytes.
        limit: u64,
    },

    /// A blob with the same id is already present.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// Reading the incoming byte source failed (client disconnect, malformed body).
    #[error("upload source error: {0}")]
    Source(#[source] std::io::Error),

    /// The backing storage failed (disk full, permissions).
    #[error("blob storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Whether the error originates on the storage side rather than with the caller.
    #[must_use]
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Self::Io(_) | Self::AlreadyExists(_))
    }
}
