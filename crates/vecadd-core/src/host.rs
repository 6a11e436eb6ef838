//! Host-resident input and output buffers.
//!
//! `A[i] = sin(r_i)^2` and `B[i] = cos(r_i)^2`, so every `A[i] + B[i]` is 1 in
//! exact arithmetic and the mean of `C` is the correctness oracle regardless
//! of how `r_i` was drawn.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{BenchError, Result};

/// Elements seeded by one generator. Fixed so seeded output does not depend
/// on the rayon thread count.
const SEED_CHUNK: usize = 1 << 16;

/// Where the per-element `r_i` values come from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputSource {
    /// Fresh OS entropy on every run. Results are not bit-reproducible.
    #[default]
    Entropy,
    /// Reproducible draws from a base seed.
    Seeded(u64),
    /// Every `r_i` takes this value.
    Constant(f64),
}

/// The three host buffers of one process.
///
/// Dropping the value releases all three; there is no other release path.
pub struct HostBuffers {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
}

impl HostBuffers {
    /// Allocate three zero-filled buffers of `len` elements.
    pub fn allocate(len: usize) -> Result<Self> {
        Ok(Self {
            a: zeroed(len)?,
            b: zeroed(len)?,
            c: zeroed(len)?,
        })
    }

    /// Allocate and seed in one step.
    pub fn generate(len: usize, source: InputSource) -> Result<Self> {
        let mut buffers = Self::allocate(len)?;
        buffers.seed(source);
        Ok(buffers)
    }

    /// Fill `A` and `B` from `source` and reset `C` to zero.
    pub fn seed(&mut self, source: InputSource) {
        let base = match source {
            InputSource::Constant(r) => {
                let (sa, sb) = components(r);
                self.a.par_iter_mut().for_each(|x| *x = sa);
                self.b.par_iter_mut().for_each(|x| *x = sb);
                self.c.par_iter_mut().for_each(|x| *x = 0.0);
                return;
            }
            InputSource::Seeded(seed) => seed,
            InputSource::Entropy => {
                let seed = rand::random::<u64>();
                debug!(seed, "drew input seed from entropy");
                seed
            }
        };

        self.a
            .par_chunks_mut(SEED_CHUNK)
            .zip(self.b.par_chunks_mut(SEED_CHUNK))
            .enumerate()
            .for_each(|(chunk, (a, b))| {
                let mut rng = StdRng::seed_from_u64(chunk_seed(base, chunk));
                for (x, y) in a.iter_mut().zip(b.iter_mut()) {
                    let (sa, sb) = components(rng.gen::<f64>());
                    *x = sa;
                    *y = sb;
                }
            });
        self.c.par_iter_mut().for_each(|x| *x = 0.0);
    }

    /// Elements per buffer.
    pub fn len(&self) -> usize {
        self.c.len()
    }

    /// Whether the buffers hold no elements.
    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Size of one buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.len() * std::mem::size_of::<f64>()
    }

    /// First input.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Second input.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Output.
    pub fn c(&self) -> &[f64] {
        &self.c
    }

    /// Output, writable.
    pub fn c_mut(&mut self) -> &mut [f64] {
        &mut self.c
    }

    /// Release all three buffers now.
    pub fn release(self) {
        debug!(bytes = 3 * self.byte_size(), "releasing host buffers");
        drop(self);
    }
}

fn zeroed(len: usize) -> Result<Vec<f64>> {
    let bytes = len.saturating_mul(std::mem::size_of::<f64>());
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| BenchError::HostAllocation { bytes })?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

fn components(r: f64) -> (f64, f64) {
    let s = r.sin();
    let c = r.cos();
    (s * s, c * c)
}

fn chunk_seed(base: u64, chunk: usize) -> u64 {
    base ^ (chunk as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
