//! Named input/output schemes.
//!
//! A scheme gives positional function arguments stable names, so front ends
//! can address inputs and outputs by name and diagnostics can describe them.

use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// An ordered list of entry names with reverse lookup.
#[derive(Debug, Clone)]
pub struct IoScheme {
    name: String,
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl IoScheme {
    /// Create a scheme from an ordered list of entry names.
    ///
    /// If a name repeats, lookup resolves to its last position.
    pub fn new(name: impl Into<String>, entries: Vec<String>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.clone(), i))
            .collect();
        Self {
            name: name.into(),
            entries,
            index,
        }
    }

    /// Scheme name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scheme has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the entry at `i`.
    pub fn entry(&self, i: usize) -> Result<&str> {
        self.entries
            .get(i)
            .map(String::as_str)
            .ok_or(CoreError::EntryOutOfRange {
                index: i,
                len: self.entries.len(),
            })
    }

    /// All entry names, comma-joined.
    pub fn entry_names(&self) -> String {
        self.entries.join(", ")
    }

    /// Position of the entry called `name`.
    pub fn index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::UnknownEntry {
                name: name.to_string(),
                available: self.entry_names(),
            })
    }

    /// Describe the input argument at `i`.
    pub fn describe_input(&self, i: usize) -> Result<String> {
        Ok(format!("Input argument #{i} ('{}')", self.entry(i)?))
    }

    /// Describe the output argument at `i`.
    pub fn describe_output(&self, i: usize) -> Result<String> {
        Ok(format!("Output argument #{i} ('{}')", self.entry(i)?))
    }
}

impl std::fmt::Display for IoScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.entry_names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> IoScheme {
        IoScheme::new(
            "ode_in",
            vec!["x".to_string(), "p".to_string(), "t".to_string()],
        )
    }

    #[test]
    fn entry_by_index() {
        let s = scheme();
        assert_eq!(s.entry(0).unwrap(), "x");
        assert_eq!(s.entry(2).unwrap(), "t");
        assert!(s.entry(3).is_err());
    }

    #[test]
    fn index_by_name() {
        let s = scheme();
        assert_eq!(s.index("p").unwrap(), 1);
        let err = s.index("q").unwrap_err();
        assert!(err.to_string().contains("x, p, t"));
    }

    #[test]
    fn describes_arguments() {
        let s = scheme();
        assert_eq!(s.describe_input(0).unwrap(), "Input argument #0 ('x')");
        assert_eq!(s.describe_output(1).unwrap(), "Output argument #1 ('p')");
    }

    #[test]
    fn duplicate_names_resolve_to_last() {
        let s = IoScheme::new("dup", vec!["a".to_string(), "a".to_string()]);
        assert_eq!(s.index("a").unwrap(), 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(scheme().to_string(), "ode_in(x, p, t)");
    }
}
