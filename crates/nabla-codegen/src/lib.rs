//! Flat, dependency-free C source generation for symbolic numeric function
//! graphs.
//!
//! A graph front end walks its functions and, for each, asks this engine to
//! declare a signature, intern constants, request calls into a small fixed
//! library of numeric auxiliary routines, and append statements. The engine
//! guarantees that each distinct constant and each distinct sub-function is
//! emitted exactly once, that auxiliary routines are transitively and
//! exactly-once included, and that the concatenation of all output sections
//! is syntactically valid, correctly indented code.
//!
//! ## Modules
//!
//! - [`generator`] — the session object tying everything together
//! - [`function`] — the collaborator contract for graph functions
//! - [`auxiliary`] — the catalog of reusable numeric routines
//! - [`pool`] — content-addressed constant pools
//! - [`buffer`] — indentation-aware text accumulation
//! - [`symbols`] — shorthand, include, and external bookkeeping
//! - [`options`] — recognized generation options
//! - [`error`] — the failure taxonomy; every failure ends the session

pub mod auxiliary;
pub mod buffer;
pub mod error;
pub mod function;
pub mod generator;
pub mod options;
pub mod pool;
pub mod symbols;

pub use auxiliary::Auxiliary;
pub use buffer::SourceBuffer;
pub use error::{CodegenError, Result};
pub use function::{new_function_id, FunctionId, GraphFunction};
pub use generator::{CodeGenerator, REAL_SCALAR};
pub use options::{OptionValue, Options};
pub use pool::{real_literal, ConstantPool};
pub use symbols::SymbolRegistry;
