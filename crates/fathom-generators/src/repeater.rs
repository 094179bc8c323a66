//! `Repeater(series, start, step, limit, transforms)` (spec §4.1): for each
//! element `r` in `series`, emit `r` repeated `i` times, for `i` stepping
//! from `start` by `step` up to `limit` (skipping `i == 0`). With
//! `step == 0`, step exponentially instead: `start + 2^k + 1` for
//! `k = 1, 2, …` while `< limit`, finally `limit` itself.

use crate::error::{GeneratorError, Result};
use crate::static_gen::Transform;
use crate::Generator;

fn step_sequence(start: i64, step: i64, limit: i64) -> Vec<i64> {
    let mut out = Vec::new();
    if step == 0 {
        let mut k: u32 = 1;
        loop {
            let candidate = start + 2i64.pow(k) + 1;
            if candidate >= limit {
                break;
            }
            out.push(candidate);
            k += 1;
        }
        out.push(limit);
    } else {
        let mut i = start;
        while i < limit {
            out.push(i);
            i += step;
        }
        out.push(limit);
    }
    out.into_iter().filter(|&i| i != 0).collect()
}

pub struct Repeater<T: Clone> {
    series: Vec<T>,
    lengths: Vec<i64>,
    transforms: Vec<Transform<Vec<T>>>,
    series_idx: usize,
    length_idx: usize,
}

impl<T: Clone> Repeater<T> {
    pub fn new(
        series: Vec<T>,
        start: i64,
        step: i64,
        limit: i64,
        transforms: Vec<Transform<Vec<T>>>,
    ) -> Self {
        let lengths = step_sequence(start, step, limit);
        Self {
            series,
            lengths,
            transforms,
            series_idx: 0,
            length_idx: 0,
        }
    }

    fn emit(&self, r: &T, count: i64) -> Vec<T> {
        let mut v: Vec<T> = std::iter::repeat(r.clone())
            .take(count.max(0) as usize)
            .collect();
        for t in &self.transforms {
            v = t(v);
        }
        v
    }
}

impl<T: Clone> Generator<Vec<T>> for Repeater<T> {
    fn has_next(&mut self) -> bool {
        self.series_idx < self.series.len() && !self.lengths.is_empty()
    }

    fn next(&mut self) -> Result<Vec<T>> {
        if !self.has_next() {
            return Err(GeneratorError::Exhausted);
        }
        let r = &self.series[self.series_idx];
        let count = self.lengths[self.length_idx];
        let out = self.emit(r, count);

        self.length_idx += 1;
        if self.length_idx >= self.lengths.len() {
            self.length_idx = 0;
            self.series_idx += 1;
        }
        Ok(out)
    }

    fn rewind(&mut self) {
        self.series_idx = 0;
        self.length_idx = 0;
    }
}
