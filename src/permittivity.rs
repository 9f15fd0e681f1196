// src/permittivity.rs
//
// Relative permittivity profiles eps(k) over the grid.
//
// The reference setup is free space on the left half and eps = 9 (n = 3)
// from the midpoint onwards:
//
//   eps(k) = 1   for k < 100
//   eps(k) = 9   for k >= 100

use std::fmt;
use std::sync::Arc;

use crate::error::SimError;
use crate::grid::Grid1D;

pub type ProfileFn = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// Relative permittivity as a pure function of the cell index.
#[derive(Clone)]
pub enum Permittivity {
    /// Same eps in every cell.
    Uniform(f64),
    /// Step discontinuity: `left` for k < boundary, `right` for k >= boundary.
    Step {
        boundary: usize,
        left: f64,
        right: f64,
    },
    /// Arbitrary user profile.
    Custom(ProfileFn),
}

impl Permittivity {
    /// Free space on the left half of an `n`-cell grid, `eps_right` beyond the midpoint.
    pub fn half_space(n: usize, eps_right: f64) -> Self {
        Self::Step {
            boundary: n / 2,
            left: 1.0,
            right: eps_right,
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[inline]
    pub fn eps_at(&self, k: usize) -> f64 {
        match self {
            Self::Uniform(eps) => *eps,
            Self::Step {
                boundary,
                left,
                right,
            } => {
                if k < *boundary {
                    *left
                } else {
                    *right
                }
            }
            Self::Custom(f) => f(k),
        }
    }

    /// Cell index of the dielectric interface, if the profile has one.
    pub fn boundary(&self) -> Option<usize> {
        match self {
            Self::Step {
                boundary,
                left,
                right,
            } if left != right => Some(*boundary),
            _ => None,
        }
    }

    /// Check eps(k) >= 1 (and finite) for every cell of `grid`.
    pub fn validate(&self, grid: &Grid1D) -> Result<(), SimError> {
        for k in 0..grid.n_cells() {
            let eps = self.eps_at(k);
            if !eps.is_finite() || eps < 1.0 {
                return Err(SimError::InvalidConfiguration(format!(
                    "relative permittivity must be finite and >= 1, got eps({k}) = {eps}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Permittivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(eps) => f.debug_tuple("Uniform").field(eps).finish(),
            Self::Step {
                boundary,
                left,
                right,
            } => f
                .debug_struct("Step")
                .field("boundary", boundary)
                .field("left", left)
                .field("right", right)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
