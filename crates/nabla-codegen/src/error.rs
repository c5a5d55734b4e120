//! Code-generation error types.
//!
//! Every failure is fatal to the generation session: nothing is retried, and
//! the caller is responsible for discarding any partially built state.

use thiserror::Error;

/// Errors that can occur during a generation session.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Unrecognized configuration key, or a value of the wrong type.
    #[error("invalid option: {detail}")]
    InvalidOption { detail: String },

    /// The output base name is not usable as a symbol prefix.
    #[error("invalid base name: '{name}'")]
    InvalidName { name: String },

    /// A shorthand symbol was resolved without ever being defined.
    #[error("no such macro: {name}")]
    UndefinedSymbol { name: String },

    /// A symbol was defined twice with conflicting meanings.
    #[error("duplicate symbol: {name}")]
    DuplicateSymbol { name: String },

    /// A local variable was re-declared with a different type or
    /// reference form.
    #[error("type mismatch for {name}: have '{have}', requested '{requested}'")]
    TypeMismatch {
        name: String,
        have: String,
        requested: String,
    },

    /// Read-only constant lookup miss.
    #[error("constant not found")]
    ConstantNotFound,

    /// Emitted text closed more braces than it opened, or finalized at
    /// nonzero depth.
    #[error("unbalanced indentation: {context}")]
    UnbalancedIndentation { context: String },

    /// A legacy call pattern was detected.
    #[error("stale interface usage: {detail}")]
    StaleInterfaceUsage { detail: String },

    /// I/O failure while dumping the rendered output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for code-generation operations.
pub type Result<T> = std::result::Result<T, CodegenError>;
