//! Grid/block launch configuration for the elementwise kernel.

use crate::error::{BenchError, Result};

/// Default threads per block.
pub const DEFAULT_THREADS_PER_BLOCK: u32 = 256;

/// Largest block size any supported device accepts.
pub const MAX_THREADS_PER_BLOCK: u32 = 1024;

/// Largest grid x-dimension (2^31 - 1 on compute capability 3.0+).
pub const MAX_GRID_DIM_X: u64 = i32::MAX as u64;

/// One-dimensional launch configuration.
///
/// `threads_per_block * blocks_per_grid >= element_count` always holds, so the
/// kernel must guard every write with `id < element_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Threads in each block.
    pub threads_per_block: u32,
    /// Blocks in the grid.
    pub blocks_per_grid: u32,
    /// Elements the kernel covers.
    pub element_count: usize,
}

impl LaunchConfig {
    /// Derive a configuration covering `element_count` elements.
    pub fn for_elements(element_count: usize, threads_per_block: u32) -> Result<Self> {
        if element_count == 0 {
            return Err(BenchError::Config(
                "element count must be greater than zero".to_string(),
            ));
        }
        if threads_per_block == 0 || threads_per_block > MAX_THREADS_PER_BLOCK {
            return Err(BenchError::Config(format!(
                "threads per block must be in 1..={}, got {}",
                MAX_THREADS_PER_BLOCK, threads_per_block
            )));
        }

        let blocks = (element_count as u64).div_ceil(threads_per_block as u64);
        if blocks > MAX_GRID_DIM_X {
            return Err(BenchError::Config(format!(
                "{} elements need {} blocks, grid limit is {}",
                element_count, blocks, MAX_GRID_DIM_X
            )));
        }

        Ok(Self {
            threads_per_block,
            blocks_per_grid: blocks as u32,
            element_count,
        })
    }

    /// Total work-items launched.
    #[must_use]
    pub fn total_threads(&self) -> u64 {
        self.threads_per_block as u64 * self.blocks_per_grid as u64
    }

    /// Grid dimensions as (x, y, z).
    #[must_use]
    pub fn grid_dim(&self) -> (u32, u32, u32) {
        (self.blocks_per_grid, 1, 1)
    }

    /// Block dimensions as (x, y, z).
    #[must_use]
    pub fn block_dim(&self) -> (u32, u32, u32) {
        (self.threads_per_block, 1, 1)
    }
}
