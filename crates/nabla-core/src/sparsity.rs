//! Compressed-column sparsity patterns.
//!
//! A pattern records which entries of a matrix are structurally nonzero, in
//! compressed column storage: `colind` has one offset per column plus a
//! terminator, and `row` lists the row of each nonzero in column-major order.
//! The code generator serializes patterns with [`Sparsity::compress`] and
//! interns the result in its integer constant pool; every generated sparse
//! routine indexes that flat layout.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A compressed-column sparsity pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sparsity {
    nrow: usize,
    ncol: usize,
    colind: Vec<usize>,
    row: Vec<usize>,
}

impl Sparsity {
    /// Create a pattern from raw compressed-column data.
    pub fn new(nrow: usize, ncol: usize, colind: Vec<usize>, row: Vec<usize>) -> Result<Self> {
        if colind.len() != ncol + 1 {
            return Err(CoreError::InvalidSparsity {
                detail: format!("colind has {} entries, expected {}", colind.len(), ncol + 1),
            });
        }
        if colind[0] != 0 {
            return Err(CoreError::InvalidSparsity {
                detail: "colind must start at zero".to_string(),
            });
        }
        if colind.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoreError::InvalidSparsity {
                detail: "colind must be non-decreasing".to_string(),
            });
        }
        if colind[ncol] != row.len() {
            return Err(CoreError::InvalidSparsity {
                detail: format!(
                    "colind terminates at {}, but row has {} entries",
                    colind[ncol],
                    row.len()
                ),
            });
        }
        if row.iter().any(|&r| r >= nrow) {
            return Err(CoreError::InvalidSparsity {
                detail: format!("row index out of range for {nrow} rows"),
            });
        }
        for c in 0..ncol {
            let col = &row[colind[c]..colind[c + 1]];
            if col.windows(2).any(|w| w[0] >= w[1]) {
                return Err(CoreError::InvalidSparsity {
                    detail: format!("rows in column {c} must be strictly increasing"),
                });
            }
        }
        Ok(Self {
            nrow,
            ncol,
            colind,
            row,
        })
    }

    /// A fully dense pattern.
    pub fn dense(nrow: usize, ncol: usize) -> Self {
        let colind = (0..=ncol).map(|c| c * nrow).collect();
        let row = (0..ncol).flat_map(|_| 0..nrow).collect();
        Self {
            nrow,
            ncol,
            colind,
            row,
        }
    }

    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Number of columns.
    pub fn ncol(&self) -> usize {
        self.ncol
    }

    /// Number of structural nonzeros.
    pub fn nnz(&self) -> usize {
        self.row.len()
    }

    /// Total number of entries, dense count.
    pub fn numel(&self) -> usize {
        self.nrow * self.ncol
    }

    /// Whether every entry is structurally nonzero.
    pub fn is_dense(&self) -> bool {
        self.nnz() == self.numel()
    }

    /// Column offsets, one per column plus a terminator.
    pub fn colind(&self) -> &[usize] {
        &self.colind
    }

    /// Row of each nonzero, column-major.
    pub fn row(&self) -> &[usize] {
        &self.row
    }

    /// Serialize as the flat integer array generated code indexes:
    /// `[nrow, ncol, colind[0..=ncol], row[0..nnz]]`.
    pub fn compress(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(2 + self.colind.len() + self.row.len());
        out.push(self.nrow as i64);
        out.push(self.ncol as i64);
        out.extend(self.colind.iter().map(|&v| v as i64));
        out.extend(self.row.iter().map(|&v| v as i64));
        out
    }
}

impl std::fmt::Display for Sparsity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}, {} nnz", self.nrow, self.ncol, self.nnz())
    }
}
