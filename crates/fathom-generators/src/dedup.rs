//! `DuplicateFilter(gen)` (spec §4.1): suppress values whose hash is
//! already present in a bounded (≤10 000) recency window.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use crate::error::{GeneratorError, Result};
use crate::Generator;

pub const WINDOW_CAPACITY: usize = 10_000;

pub struct DuplicateFilter<T: Hash> {
    inner: Box<dyn Generator<T> + Send>,
    window: VecDeque<u64>,
    seen: HashSet<u64>,
    pending: Option<T>,
}

impl<T: Hash> DuplicateFilter<T> {
    pub fn new(inner: Box<dyn Generator<T> + Send>) -> Self {
        Self {
            inner,
            window: VecDeque::new(),
            seen: HashSet::new(),
            pending: None,
        }
    }

    fn hash_of(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn remember(&mut self, h: u64) {
        if self.window.len() >= WINDOW_CAPACITY {
            if let Some(oldest) = self.window.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.window.push_back(h);
        self.seen.insert(h);
    }

    fn fill_pending(&mut self) {
        while self.inner.has_next() {
            let Ok(value) = self.inner.next() else {
                return;
            };
            let h = Self::hash_of(&value);
            if !self.seen.contains(&h) {
                self.remember(h);
                self.pending = Some(value);
                return;
            }
        }
    }
}

impl<T: Hash> Generator<T> for DuplicateFilter<T> {
    fn has_next(&mut self) -> bool {
        if self.pending.is_none() {
            self.fill_pending();
        }
        self.pending.is_some()
    }

    fn next(&mut self) -> Result<T> {
        if self.pending.is_none() {
            self.fill_pending();
        }
        self.pending.take().ok_or(GeneratorError::Exhausted)
    }

    fn rewind(&mut self) {
        self.inner.rewind();
        self.window.clear();
        self.seen.clear();
        self.pending = None;
    }
}
