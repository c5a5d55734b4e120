//! Generation options.
//!
//! Options arrive from the graph front ends as loosely typed key/value
//! pairs; unknown keys and ill-typed values are fatal.

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, Result};

/// A dynamically typed option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

/// Recognized code-generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Emit human-readable comment annotations.
    pub verbose: bool,
    /// Enable the host-interop dispatch wrapper and guarded marshalling
    /// routines.
    pub mex: bool,
    /// Target C++ linkage instead of C linkage.
    pub cpp: bool,
    /// Enable the command-line dispatch wrapper.
    pub main: bool,
    /// Name of the floating scalar type behind the `nabla_real` typedef.
    pub real_type: String,
    /// Represent single-element work buffers as dereferenced scalars
    /// rather than one-element arrays.
    pub codegen_scalars: bool,
    /// Also produce a declarations file.
    pub with_header: bool,
    /// Include the memory-management interop header.
    pub with_mem: bool,
    /// Wrap public symbols with a visibility/export macro.
    pub with_export: bool,
    /// Spaces per indentation level.
    pub indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: true,
            mex: false,
            cpp: false,
            main: false,
            real_type: "double".to_string(),
            codegen_scalars: false,
            with_header: false,
            with_mem: false,
            with_export: true,
            indent: 2,
        }
    }
}

impl Options {
    /// Build options from key/value pairs, starting from the defaults.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, OptionValue)>,
    {
        let mut opts = Self::default();
        for (key, value) in pairs {
            opts.set(key, value)?;
        }
        Ok(opts)
    }

    /// Set a single option by key.
    pub fn set(&mut self, key: &str, value: OptionValue) -> Result<()> {
        match key {
            "verbose" => self.verbose = bool_value(key, value)?,
            "mex" => self.mex = bool_value(key, value)?,
            "cpp" => self.cpp = bool_value(key, value)?,
            "main" => self.main = bool_value(key, value)?,
            "real_type" => self.real_type = str_value(key, value)?,
            "codegen_scalars" => self.codegen_scalars = bool_value(key, value)?,
            "with_header" => self.with_header = bool_value(key, value)?,
            "with_mem" => self.with_mem = bool_value(key, value)?,
            "with_export" => self.with_export = bool_value(key, value)?,
            "indent" => self.indent = indent_value(key, value)?,
            _ => {
                return Err(CodegenError::InvalidOption {
                    detail: format!("unrecognized option '{key}'"),
                })
            }
        }
        Ok(())
    }
}

fn bool_value(key: &str, value: OptionValue) -> Result<bool> {
    match value {
        OptionValue::Bool(b) => Ok(b),
        _ => Err(CodegenError::InvalidOption {
            detail: format!("option '{key}' expects a boolean"),
        }),
    }
}

fn str_value(key: &str, value: OptionValue) -> Result<String> {
    match value {
        OptionValue::Str(s) => Ok(s),
        _ => Err(CodegenError::InvalidOption {
            detail: format!("option '{key}' expects a string"),
        }),
    }
}

fn indent_value(key: &str, value: OptionValue) -> Result<usize> {
    match value {
        OptionValue::Int(i) if i >= 0 => Ok(i as usize),
        _ => Err(CodegenError::InvalidOption {
            detail: format!("option '{key}' expects a non-negative integer"),
        }),
    }
}
