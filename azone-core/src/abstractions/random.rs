//! Random integer source abstraction

use rand::Rng;

pub trait RandomSource: Send + Sync {
    /// A uniformly distributed integer in `low..=high`.
    fn random_int(&self, low: u64, high: u64) -> u64;
}

/// Random source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl ThreadRandom {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for ThreadRandom {
    fn random_int(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}
