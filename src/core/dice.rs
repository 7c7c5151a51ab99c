/// Randomness seam for round building
use rand::seq::SliceRandom;
use rand::Rng;

/// Source of the random draws a round needs.
///
/// Implementors are owned by a single task; nothing here is shared.
pub trait Dice {
    /// Uniform integer in `[0, limit)`. Callers guarantee `limit > 0`.
    fn below(&mut self, limit: usize) -> usize;

    /// Uniform permutation of `0..len`. Element `i` of the input ends up at
    /// position `perm[i]`.
    fn permutation(&mut self, len: usize) -> Vec<usize>;
}

/// Dice backed by any `rand` generator.
pub struct RandomDice<R> {
    rng: R,
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Dice for RandomDice<R> {
    fn below(&mut self, limit: usize) -> usize {
        self.rng.random_range(0..limit)
    }

    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..len).collect();
        perm.shuffle(&mut self.rng);
        perm
    }
}
