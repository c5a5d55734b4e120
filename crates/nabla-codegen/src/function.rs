//! The collaborator contract.
//!
//! The symbolic graph front end drives the engine through this trait: for
//! each function it wants compiled, it supplies a signature and callbacks
//! that write declarations, the body, and trailing metadata into the
//! engine's buffer. Functions are deduplicated by [`FunctionId`], an opaque
//! handle compared by identity, never by value.

use nabla_core::Sparsity;
use uuid::Uuid;

use crate::error::Result;
use crate::generator::CodeGenerator;

/// Opaque identity of a symbolic function.
pub type FunctionId = Uuid;

/// Allocate a fresh function identity.
pub fn new_function_id() -> FunctionId {
    Uuid::new_v4()
}

/// A symbolic function the engine can generate code for.
pub trait GraphFunction {
    /// Stable identity, assigned when the function was built.
    fn id(&self) -> FunctionId;

    /// Public name, used for exposed wrappers and dispatch tables.
    fn name(&self) -> &str;

    /// Full C signature of the function under the symbol `fname`.
    fn signature(&self, fname: &str) -> String;

    /// Emit forward declarations this function needs.
    fn codegen_declarations(&self, g: &mut CodeGenerator) -> Result<()> {
        let _ = g;
        Ok(())
    }

    /// Emit the complete definition under the generated symbol `fname`.
    fn codegen(&self, g: &mut CodeGenerator, fname: &str) -> Result<()>;

    /// Emit trailing metadata after the exposed wrapper.
    fn codegen_meta(&self, g: &mut CodeGenerator) -> Result<()> {
        let _ = g;
        Ok(())
    }

    /// Whether reference-count increment/decrement wrappers are needed.
    fn has_refcount(&self) -> bool {
        false
    }

    /// Emit the body of the reference-count increment wrapper.
    fn codegen_incref(&self, g: &mut CodeGenerator) -> Result<()> {
        let _ = g;
        Ok(())
    }

    /// Emit the body of the reference-count decrement wrapper.
    fn codegen_decref(&self, g: &mut CodeGenerator) -> Result<()> {
        let _ = g;
        Ok(())
    }

    /// Sparsity pattern of each input.
    fn sparsity_in(&self) -> &[Sparsity];

    /// Sparsity pattern of each output.
    fn sparsity_out(&self) -> &[Sparsity];

    /// Sparsity of the Jacobian of all outputs with respect to all inputs.
    /// Dense by default.
    fn jacobian_sparsity(&self) -> Sparsity {
        let n_in = self.sparsity_in().iter().map(Sparsity::nnz).sum();
        let n_out = self.sparsity_out().iter().map(Sparsity::nnz).sum();
        Sparsity::dense(n_out, n_in)
    }
}
