//! Randomness used for prediction selection and wish colors

use rand::Rng;

/// Source of uniform indices
///
/// Injected into [`crate::Repository`] so tests can pin the outcome of
/// random selections.
pub trait RandomSource: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Thread-local RNG from the `rand` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}
