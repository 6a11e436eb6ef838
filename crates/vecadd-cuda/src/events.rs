//! CUDA event wrappers for GPU-side timing.
//!
//! Events are recorded on a stream and timed entirely on the GPU, so the
//! measured window covers only the work enqueued between the two records.
//!
//! # Example
//!
//! ```ignore
//! use vecadd_cuda::events::CudaEvent;
//!
//! let mut start = CudaEvent::new()?;
//! let mut end = CudaEvent::new()?;
//! unsafe {
//!     start.record(stream)?;
//!     // ... kernel launch ...
//!     end.record(stream)?;
//!     end.synchronize()?;
//!     println!("Elapsed: {:.3} ms", CudaEvent::elapsed_ms(&start, &end)?);
//! }
//! ```

use cudarc::driver::result as cuda_result;
use cudarc::driver::sys as cuda_sys;

use vecadd_core::error::{DeviceError, DeviceResult};

/// A timing event created with blocking synchronization, so a host wait
/// sleeps instead of spinning.
///
/// The event is destroyed on drop.
pub struct CudaEvent {
    event: cuda_sys::CUevent,
    recorded: bool,
}

impl CudaEvent {
    /// Create a new CUDA event.
    ///
    /// A CUDA context must be current on the calling thread.
    pub fn new() -> DeviceResult<Self> {
        let event = cuda_result::event::create(cuda_sys::CUevent_flags::CU_EVENT_BLOCKING_SYNC)
            .map_err(|e| DeviceError::api("cuEventCreate", e))?;
        Ok(Self {
            event,
            recorded: false,
        })
    }

    /// Record this event on a stream.
    ///
    /// All work submitted to the stream before this call completes before
    /// the event.
    ///
    /// # Safety
    ///
    /// The stream must be valid and belong to the current CUDA context.
    pub unsafe fn record(&mut self, stream: cuda_sys::CUstream) -> DeviceResult<()> {
        cuda_result::event::record(self.event, stream)
            .map_err(|e| DeviceError::api("cuEventRecord", e))?;
        self.recorded = true;
        Ok(())
    }

    /// Block the calling thread until the event has completed.
    pub fn synchronize(&self) -> DeviceResult<()> {
        self.require_recorded()?;
        // Safety: the event handle is live and has been recorded.
        unsafe {
            cuda_result::event::synchronize(self.event)
                .map_err(|e| DeviceError::api("cuEventSynchronize", e))
        }
    }

    /// Milliseconds between two completed events.
    pub fn elapsed_ms(start: &CudaEvent, end: &CudaEvent) -> DeviceResult<f32> {
        start.require_recorded()?;
        end.require_recorded()?;
        // Safety: both handles are live and recorded.
        unsafe {
            cuda_result::event::elapsed(start.event, end.event)
                .map_err(|e| DeviceError::api("cuEventElapsedTime", e))
        }
    }

    fn require_recorded(&self) -> DeviceResult<()> {
        if !self.recorded {
            return Err(DeviceError::InvalidState {
                expected: "recorded".to_string(),
                actual: "not recorded".to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for CudaEvent {
    fn drop(&mut self) {
        // Safety: We own this event and it's being destroyed
        unsafe {
            let _ = cuda_result::event::destroy(self.event);
        }
    }
}
