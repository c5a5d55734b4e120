//! Shorthand symbols, include tracking, and external declarations.
//!
//! Generated code refers to internal symbols through short names like
//! `nabla_f0` or `nabla_s2`; a macro block emitted at the top of the file
//! maps each short name onto a namespace prefix chosen at emission time
//! (either a caller-supplied `CODEGEN_PREFIX` or a default derived from the
//! output base name). The registry therefore stores only the short names.

use std::collections::{BTreeSet, HashSet};

use crate::error::{CodegenError, Result};

/// Prefix applied to every shorthand in emitted code.
pub const SHORTHAND_PREFIX: &str = "nabla_";

/// Registry of shorthand symbols, seen includes, and external declarations.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    shorthands: BTreeSet<String>,
    includes_seen: HashSet<String>,
    externals: BTreeSet<String>,
}

impl SymbolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `short` and return its namespaced name. Idempotent.
    pub fn define(&mut self, short: &str) -> String {
        self.shorthands.insert(short.to_string());
        format!("{SHORTHAND_PREFIX}{short}")
    }

    /// Register `short`, failing if it was already defined.
    pub fn define_unique(&mut self, short: &str) -> Result<String> {
        if !self.shorthands.insert(short.to_string()) {
            return Err(CodegenError::DuplicateSymbol {
                name: short.to_string(),
            });
        }
        Ok(format!("{SHORTHAND_PREFIX}{short}"))
    }

    /// Resolve a previously defined shorthand to its namespaced name.
    pub fn resolve(&self, short: &str) -> Result<String> {
        if !self.shorthands.contains(short) {
            return Err(CodegenError::UndefinedSymbol {
                name: short.to_string(),
            });
        }
        Ok(format!("{SHORTHAND_PREFIX}{short}"))
    }

    /// All registered shorthands, sorted.
    pub fn shorthands(&self) -> impl Iterator<Item = &str> {
        self.shorthands.iter().map(String::as_str)
    }

    /// Whether any shorthand has been registered.
    pub fn has_shorthands(&self) -> bool {
        !self.shorthands.is_empty()
    }

    /// Record that `header` was requested for inclusion. Returns false if it
    /// was already requested.
    pub fn note_include(&mut self, header: &str) -> bool {
        self.includes_seen.insert(header.to_string())
    }

    /// Add a forward-declared external symbol, deduplicated by exact text.
    pub fn add_external(&mut self, declaration: &str) {
        self.externals.insert(declaration.to_string());
    }

    /// All external declarations, sorted.
    pub fn externals(&self) -> impl Iterator<Item = &str> {
        self.externals.iter().map(String::as_str)
    }

    /// Whether any external declaration was added.
    pub fn has_externals(&self) -> bool {
        !self.externals.is_empty()
    }
}
