//! Bounded random sampling under a size constraint.
//!
//! Draws items uniformly with replacement from a pool, keeping those whose
//! size is within a maximum, and gives up after `2 * target_count + 1` draws.
//! Completeness is traded for a fixed upper bound on running time: an unlucky
//! run can return fewer items even if the pool holds enough valid ones.
//!
//! The random source is injected through [`IndexSource`], so a seeded RNG
//! makes a run reproducible and tests can script the exact draws.

use crate::domain::model::{round_mb, Sample, SizedItem};
use rand::seq::IndexedRandom;
use rand::Rng;

/// Source of uniformly distributed indices.
pub trait IndexSource {
    /// Returns an index in `0..len`. `len` is never zero.
    fn next_index(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> IndexSource for R {
    fn next_index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedSampler {
    target_count: usize,
    max_size: f64,
}

impl BoundedSampler {
    pub fn new(target_count: usize, max_size: f64) -> Self {
        Self {
            target_count,
            max_size,
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    pub fn max_size(&self) -> f64 {
        self.max_size
    }

    /// Highest attempt index; the loop runs while `attempts <= max_attempts()`.
    pub fn max_attempts(&self) -> usize {
        self.target_count * 2
    }

    /// Samples using the thread-local RNG.
    pub fn sample<'a, T: SizedItem>(&self, pool: &'a [T]) -> Sample<'a, T> {
        self.sample_with(pool, &mut rand::rng())
    }

    pub fn sample_with<'a, T, S>(&self, pool: &'a [T], source: &mut S) -> Sample<'a, T>
    where
        T: SizedItem,
        S: IndexSource + ?Sized,
    {
        if pool.is_empty() || self.target_count == 0 {
            return Sample::empty();
        }

        let mut items = Vec::with_capacity(self.target_count);
        let mut total_size = 0.0;
        let mut attempts = 0;

        while attempts <= self.max_attempts() && items.len() < self.target_count {
            let candidate = &pool[source.next_index(pool.len())];
            attempts += 1;

            let size = candidate.size();
            if size > self.max_size {
                continue;
            }
            items.push(candidate);
            total_size += size;
        }

        Sample {
            items,
            total_size: round_mb(total_size),
            attempts,
        }
    }
}

/// Draws `target_count` items of at most `max_size` from `pool`.
pub fn sample<'a, T, S>(pool: &'a [T], target_count: usize, max_size: f64, source: &mut S) -> Sample<'a, T>
where
    T: SizedItem,
    S: IndexSource + ?Sized,
{
    BoundedSampler::new(target_count, max_size).sample_with(pool, source)
}

/// Picks `min(amount, pool.len())` distinct items, without replacement.
pub fn sample_distinct<'a, T, R>(pool: &'a [T], amount: usize, rng: &mut R) -> Vec<&'a T>
where
    R: Rng + ?Sized,
{
    pool.choose_multiple(rng, amount).collect()
}
