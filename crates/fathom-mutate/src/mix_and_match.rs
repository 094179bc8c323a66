//! `mix_and_match(max_len, sets, percentages, utf16)` (spec §4.3): at each
//! requested length, produce a token by rolling `1..100` against
//! cumulative `percentages` and sampling from the matched set.
//!
//! The spec calls the return type a `Repeater`; that combinator repeats a
//! single series element verbatim, which doesn't fit "roll per length,
//! sample a fresh token each time" — so this is its own generator rather
//! than a literal `fathom_generators::Repeater` instantiation (recorded
//! as a resolved open question in DESIGN.md).

use rand::Rng;

use fathom_generators::error::{GeneratorError, Result};
use fathom_generators::Generator;

pub struct MixAndMatch {
    max_len: usize,
    sets: Vec<Vec<u8>>,
    percentages: Vec<u8>,
    utf16: bool,
    length: usize,
}

impl MixAndMatch {
    pub fn new(max_len: usize, sets: Vec<Vec<u8>>, percentages: Vec<u8>, utf16: bool) -> Self {
        Self {
            max_len,
            sets,
            percentages,
            utf16,
            length: 1,
        }
    }

    fn pick_set(&self) -> &[u8] {
        let roll = rand::thread_rng().gen_range(1..=99u8);
        for (idx, &cum) in self.percentages.iter().enumerate() {
            if roll <= cum {
                return &self.sets[idx.min(self.sets.len() - 1)];
            }
        }
        self.sets.last().map(|s| s.as_slice()).unwrap_or(&[])
    }

    fn sample_token(&self, len: usize) -> Vec<u8> {
        let pool = self.pick_set();
        let mut rng = rand::thread_rng();
        let raw: Vec<u8> = (0..len)
            .map(|_| {
                if pool.is_empty() {
                    0
                } else {
                    pool[rng.gen_range(0..pool.len())]
                }
            })
            .collect();
        if self.utf16 {
            let mut out = Vec::with_capacity(raw.len() * 2 + 1);
            for b in raw {
                out.push(b);
                out.push(0);
            }
            out.push(0);
            out
        } else {
            raw
        }
    }
}

impl Generator<Vec<u8>> for MixAndMatch {
    fn has_next(&mut self) -> bool {
        self.length <= self.max_len
    }

    fn next(&mut self) -> Result<Vec<u8>> {
        if !self.has_next() {
            return Err(GeneratorError::Exhausted);
        }
        let token = self.sample_token(self.length);
        self.length += 1;
        Ok(token)
    }

    fn rewind(&mut self) {
        self.length = 1;
    }
}
