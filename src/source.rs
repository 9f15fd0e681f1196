// src/source.rs

use std::fmt;
use std::sync::Arc;

pub type WaveformFn = Arc<dyn Fn(u64) -> f64 + Send + Sync>;

/// Hard source driving E[0]. Its value overwrites the cell every step.
#[derive(Clone)]
pub enum Source {
    /// s(t) = exp(-((t - t0)^2) / spread)
    GaussianPulse { t0: f64, spread: f64 },
    Custom(WaveformFn),
}

impl Default for Source {
    /// Pulse centred at t = 30 with an effective half-width of ~10 steps.
    fn default() -> Self {
        Self::GaussianPulse {
            t0: 30.0,
            spread: 100.0,
        }
    }
}

impl Source {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u64) -> f64 + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    #[inline]
    pub fn value_at(&self, t: u64) -> f64 {
        match self {
            Self::GaussianPulse { t0, spread } => {
                let d = t as f64 - t0;
                (-d * d / spread).exp()
            }
            Self::Custom(f) => f(t),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GaussianPulse { t0, spread } => f
                .debug_struct("GaussianPulse")
                .field("t0", t0)
                .field("spread", spread)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
