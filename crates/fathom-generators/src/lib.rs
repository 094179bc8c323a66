//! Lazy, restartable sequences of fuzzed values (spec §4.1).
//!
//! Every generator in this crate implements [`Generator`]: `has_next`,
//! `next`, `rewind`. `next` after exhaustion fails with
//! [`error::GeneratorError::Exhausted`]; `rewind` restores the initial
//! state exactly, and is idempotent.

pub mod cartesian;
pub mod chain;
pub mod chop;
pub mod corner_cases;
pub mod dedup;
pub mod enumerate_bits;
pub mod error;
pub mod rand_gen;
pub mod repeater;
pub mod rolling_corrupt;
pub mod static_gen;
pub mod vecgen;

pub use cartesian::Cartesian;
pub use chain::Chain;
pub use chop::chop;
pub use corner_cases::binary_corner_cases;
pub use dedup::DuplicateFilter;
pub use enumerate_bits::EnumerateBits;
pub use error::{GeneratorError, Result};
pub use rand_gen::Rand;
pub use repeater::Repeater;
pub use rolling_corrupt::{Endianness, RollingCorrupt};
pub use static_gen::Static;
pub use vecgen::VecGenerator;

/// A lazy, finite-or-infinite producer of values of a single type.
/// Single-use per traversal; `rewind()` must restore the state a fresh
/// instance would have had, and must be idempotent.
pub trait Generator<T> {
    /// Lookahead generators (`DuplicateFilter`) may need to consume and
    /// cache a value from their inner sequence to answer this, hence
    /// `&mut self` rather than `&self`.
    fn has_next(&mut self) -> bool;
    fn next(&mut self) -> Result<T>;
    fn rewind(&mut self);

    /// Drain the remaining sequence into a `Vec`. Used by tests (spec §8
    /// invariant 4: `rewind(); collect() == collect()`).
    fn collect_remaining(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        while self.has_next() {
            out.push(self.next().expect("has_next() just returned true"));
        }
        out
    }
}
