// src/grid.rs

use crate::error::SimError;

/// Uniform 1D finite-difference grid with unit cell spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid1D {
    pub n: usize,
}

impl Grid1D {
    /// Create a grid with `n` cells. At least two cells are needed so that
    /// the H pass (cells 0..n-1) and the E pass (cells 1..n) are non-empty.
    pub fn new(n: usize) -> Result<Self, SimError> {
        if n < 2 {
            return Err(SimError::InvalidConfiguration(format!(
                "grid needs at least 2 cells, got {n}"
            )));
        }
        Ok(Self { n })
    }

    /// Total number of cells.
    pub fn n_cells(&self) -> usize {
        self.n
    }

    /// Index of the right-edge cell, whose H value is never updated.
    #[inline]
    pub fn last(&self) -> usize {
        self.n - 1
    }

    #[inline]
    pub fn contains(&self, k: usize) -> bool {
        k < self.n
    }

    /// Cells visible in a snapshot: 1..n (cell 0 is the source cell).
    pub fn interior(&self) -> std::ops::Range<usize> {
        1..self.n
    }
}
