//! `Rand(L, N)` (spec §4.1): N uniform integers in `[0, 2^L)`.

use rand::Rng;

use crate::error::{GeneratorError, Result};
use crate::Generator;

pub struct Rand {
    bits: u32,
    n: usize,
    emitted: usize,
}

impl Rand {
    pub fn new(bits: u32, n: usize) -> Self {
        assert!(bits > 0 && bits <= 64, "bits out of range");
        Self {
            bits,
            n,
            emitted: 0,
        }
    }

    fn sample(&self) -> u64 {
        let mut rng = rand::thread_rng();
        if self.bits == 64 {
            rng.gen::<u64>()
        } else {
            rng.gen_range(0..(1u64 << self.bits))
        }
    }
}

impl Generator<u64> for Rand {
    fn has_next(&mut self) -> bool {
        self.emitted < self.n
    }

    fn next(&mut self) -> Result<u64> {
        if !self.has_next() {
            return Err(GeneratorError::Exhausted);
        }
        let v = self.sample();
        self.emitted += 1;
        Ok(v)
    }

    fn rewind(&mut self) {
        self.emitted = 0;
    }
}
