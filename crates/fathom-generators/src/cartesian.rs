//! `Cartesian(gens...)` (spec §4.1): emit every tuple in the cartesian
//! product of the given generators, lexicographic order, first argument
//! varying slowest.

use crate::error::{GeneratorError, Result};
use crate::Generator;

/// Cartesian product over generators of a single homogeneous element type.
/// Each child is fully drained once up front (generators are single-use —
/// see the crate-level contract), then the product iterates over the
/// cached pools with a mixed-radix counter whose last digit advances
/// fastest.
pub struct Cartesian<T: Clone> {
    pools: Vec<Vec<T>>,
    digits: Vec<usize>,
    total: usize,
    emitted: usize,
}

impl<T: Clone> Cartesian<T> {
    pub fn new(gens: Vec<Box<dyn Generator<T> + Send>>) -> Self {
        let pools: Vec<Vec<T>> = gens
            .into_iter()
            .map(|mut g| g.collect_remaining())
            .collect();
        let total = if pools.iter().any(|p| p.is_empty()) {
            0
        } else {
            pools.iter().map(|p| p.len()).product()
        };
        let digits = vec![0usize; pools.len()];
        Self {
            pools,
            digits,
            total,
            emitted: 0,
        }
    }

    fn current_tuple(&self) -> Vec<T> {
        self.digits
            .iter()
            .enumerate()
            .map(|(i, &d)| self.pools[i][d].clone())
            .collect()
    }

    fn advance(&mut self) {
        for i in (0..self.digits.len()).rev() {
            self.digits[i] += 1;
            if self.digits[i] < self.pools[i].len() {
                return;
            }
            self.digits[i] = 0;
        }
    }
}

impl<T: Clone> Generator<Vec<T>> for Cartesian<T> {
    fn has_next(&mut self) -> bool {
        self.emitted < self.total
    }

    fn next(&mut self) -> Result<Vec<T>> {
        if !self.has_next() {
            return Err(GeneratorError::Exhausted);
        }
        let tuple = self.current_tuple();
        self.advance();
        self.emitted += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) {
        self.digits.iter_mut().for_each(|d| *d = 0);
        self.emitted = 0;
    }
}
