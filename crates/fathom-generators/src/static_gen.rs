//! `Static(v, limit, transforms)` (spec §4.1): yield a deep-copied `v`
//! through a transform pipeline, `limit` times, or forever if `limit == -1`.

use crate::error::{GeneratorError, Result};
use crate::Generator;

pub type Transform<T> = Box<dyn Fn(T) -> T + Send + Sync>;

pub struct Static<T: Clone> {
    value: T,
    limit: Option<u64>,
    transforms: Vec<Transform<T>>,
    emitted: u64,
}

impl<T: Clone> Static<T> {
    /// `limit: -1` means emit forever (spec §4.1).
    pub fn new(value: T, limit: i64, transforms: Vec<Transform<T>>) -> Self {
        Self {
            value,
            limit: if limit < 0 { None } else { Some(limit as u64) },
            transforms,
            emitted: 0,
        }
    }

    fn apply_transforms(&self) -> T {
        let mut v = self.value.clone();
        for t in &self.transforms {
            v = t(v);
        }
        v
    }
}

impl<T: Clone> Generator<T> for Static<T> {
    fn has_next(&mut self) -> bool {
        match self.limit {
            None => true,
            Some(limit) => self.emitted < limit,
        }
    }

    fn next(&mut self) -> Result<T> {
        if !self.has_next() {
            return Err(GeneratorError::Exhausted);
        }
        let v = self.apply_transforms();
        self.emitted += 1;
        Ok(v)
    }

    fn rewind(&mut self) {
        self.emitted = 0;
    }
}
