//! Host-emulated accelerator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use vecadd_core::error::{DeviceError, DeviceResult};
use vecadd_core::launch::LaunchConfig;
use vecadd_core::{Accelerator, DeviceBuffer};

/// "Device" memory backed by a host vector.
#[derive(Debug, Clone)]
pub struct CpuBuffer {
    data: Vec<f64>,
}

impl CpuBuffer {
    /// View the contents.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl DeviceBuffer for CpuBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Timestamp event. Launches are synchronous, so recording takes the time
/// immediately.
#[derive(Debug, Default)]
pub struct CpuEvent {
    recorded: Option<Instant>,
}

impl CpuEvent {
    /// Whether the event has been recorded.
    pub(crate) fn is_recorded(&self) -> bool {
        self.recorded.is_some()
    }
}

/// Work done by one emulated launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchStats {
    /// Blocks in the grid.
    pub blocks: u32,
    /// Work-items executed, including idle ones past the end.
    pub work_items: u64,
    /// Elements written.
    pub writes: u64,
}

/// Accelerator that runs kernels on the host thread pool.
pub struct CpuAccelerator {
    name: String,
    last_launch: Mutex<Option<LaunchStats>>,
    launches: AtomicU64,
    bytes_to_device: AtomicU64,
    bytes_to_host: AtomicU64,
}

impl CpuAccelerator {
    /// Create an accelerator on the global rayon pool.
    pub fn new() -> Self {
        let name = format!("cpu ({} threads)", rayon::current_num_threads());
        info!("Initializing CPU accelerator: {}", name);
        Self {
            name,
            last_launch: Mutex::new(None),
            launches: AtomicU64::new(0),
            bytes_to_device: AtomicU64::new(0),
            bytes_to_host: AtomicU64::new(0),
        }
    }

    /// Statistics of the most recent launch.
    pub fn last_launch(&self) -> Option<LaunchStats> {
        *self.last_launch.lock()
    }

    /// Total launches.
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    /// Total bytes copied host to device.
    pub fn bytes_to_device(&self) -> u64 {
        self.bytes_to_device.load(Ordering::Relaxed)
    }

    /// Total bytes copied device to host.
    pub fn bytes_to_host(&self) -> u64 {
        self.bytes_to_host.load(Ordering::Relaxed)
    }
}

impl Default for CpuAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

fn check_len(required: usize, available: usize) -> DeviceResult<()> {
    if required > available {
        return Err(DeviceError::OutOfBounds {
            required,
            available,
        });
    }
    Ok(())
}

impl Accelerator for CpuAccelerator {
    type Buffer = CpuBuffer;
    type Event = CpuEvent;

    fn name(&self) -> &str {
        &self.name
    }

    fn alloc(&self, len: usize) -> DeviceResult<CpuBuffer> {
        let bytes = len.saturating_mul(std::mem::size_of::<f64>());
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| DeviceError::Allocation {
                bytes,
                reason: e.to_string(),
            })?;
        // NaN so that an element the kernel skips cannot pass verification.
        data.resize(len, f64::NAN);
        Ok(CpuBuffer { data })
    }

    fn copy_to_device(&self, src: &[f64], dst: &mut CpuBuffer) -> DeviceResult<()> {
        check_len(src.len(), dst.len())?;
        dst.data[..src.len()].copy_from_slice(src);
        self.bytes_to_device
            .fetch_add(std::mem::size_of_val(src) as u64, Ordering::Relaxed);
        Ok(())
    }

    fn copy_to_host(&self, src: &CpuBuffer, dst: &mut [f64]) -> DeviceResult<()> {
        check_len(dst.len(), src.len())?;
        dst.copy_from_slice(&src.data[..dst.len()]);
        self.bytes_to_host
            .fetch_add(std::mem::size_of_val(dst) as u64, Ordering::Relaxed);
        Ok(())
    }

    fn create_event(&self) -> DeviceResult<CpuEvent> {
        Ok(CpuEvent::default())
    }

    fn record_event(&self, event: &mut CpuEvent) -> DeviceResult<()> {
        event.recorded = Some(Instant::now());
        Ok(())
    }

    fn synchronize_event(&self, event: &CpuEvent) -> DeviceResult<()> {
        if !event.is_recorded() {
            return Err(DeviceError::InvalidState {
                expected: "recorded".to_string(),
                actual: "not recorded".to_string(),
            });
        }
        Ok(())
    }

    fn elapsed_ms(&self, start: &CpuEvent, end: &CpuEvent) -> DeviceResult<f32> {
        match (start.recorded, end.recorded) {
            (Some(start), Some(end)) => {
                Ok(end.saturating_duration_since(start).as_secs_f32() * 1000.0)
            }
            _ => Err(DeviceError::InvalidState {
                expected: "both events recorded".to_string(),
                actual: "unrecorded event".to_string(),
            }),
        }
    }

    fn launch_vector_add(
        &self,
        config: &LaunchConfig,
        a: &CpuBuffer,
        b: &CpuBuffer,
        c: &mut CpuBuffer,
    ) -> DeviceResult<()> {
        let n = config.element_count;
        check_len(n, a.len())?;
        check_len(n, b.len())?;
        check_len(n, c.len())?;

        let threads = config.threads_per_block as usize;
        let blocks = config.blocks_per_grid as usize;
        let (a, b) = (&a.data, &b.data);

        debug!(blocks, threads, n, "emulating vector_add grid");

        // One chunk of C per block; a block past the end of C has no chunk
        // and every one of its work-items would fail the guard anyway.
        let writes: u64 = c
            .data
            .par_chunks_mut(threads)
            .take(blocks)
            .enumerate()
            .map(|(block, out)| {
                let mut writes = 0u64;
                for thread in 0..threads {
                    let id = block * threads + thread;
                    if id < n {
                        out[thread] = a[id] + b[id];
                        writes += 1;
                    }
                }
                writes
            })
            .sum();

        *self.last_launch.lock() = Some(LaunchStats {
            blocks: config.blocks_per_grid,
            work_items: config.total_threads(),
            writes,
        });
        self.launches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
