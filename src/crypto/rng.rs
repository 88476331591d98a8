// src/crypto/rng.rs
//! Per-session IV source
//!
//! Each [`Locker`](crate::Locker) owns one [`IvGenerator`]. There is no
//! process-wide random state: two writers never share a generator, and a
//! fixed seed makes a writer's output byte-for-byte reproducible.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::aliases::Iv32;
use crate::consts::ATC_BUF_SIZE;

#[derive(Debug, Clone)]
pub struct IvGenerator(StdRng);

impl IvGenerator {
    /// Seeded from the operating system's entropy source.
    #[inline]
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Deterministic generator for reproducible archives and tests.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Next 32-byte IV.
    #[inline]
    pub fn next_iv(&mut self) -> Iv32 {
        let mut bytes = [0u8; ATC_BUF_SIZE];
        self.0.fill_bytes(&mut bytes);
        Iv32::new(bytes)
    }
}

impl Default for IvGenerator {
    #[inline]
    fn default() -> Self {
        Self::from_os()
    }
}
