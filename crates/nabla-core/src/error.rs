//! Core error types.

/// Errors from the shared data carriers.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A sparsity pattern failed structural validation.
    #[error("invalid sparsity pattern: {detail}")]
    InvalidSparsity { detail: String },

    /// A scheme entry was requested by an unknown name.
    #[error("no entry '{name}' in scheme. Available entries: {available}")]
    UnknownEntry { name: String, available: String },

    /// A scheme entry was requested by an out-of-range index.
    #[error("entry index {index} out of range for scheme of length {len}")]
    EntryOutOfRange { index: usize, len: usize },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
