//! Accelerator abstraction.
//!
//! A backend supplies device memory, host/device copies, event timestamps and
//! a `vector_add` kernel. Device buffers and events release themselves on
//! drop, so every exit path frees them.

use crate::error::DeviceResult;
use crate::launch::LaunchConfig;

/// Device-resident `f64` buffer.
pub trait DeviceBuffer {
    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes.
    fn byte_size(&self) -> usize {
        self.len() * std::mem::size_of::<f64>()
    }
}

/// An accelerator the benchmark can offload `C = A + B` to.
pub trait Accelerator {
    /// Device buffer type.
    type Buffer: DeviceBuffer;
    /// Timestamp event type.
    type Event;

    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Allocate `len` elements of device memory. Contents are unspecified.
    fn alloc(&self, len: usize) -> DeviceResult<Self::Buffer>;

    /// Copy `src` into the start of `dst`.
    fn copy_to_device(&self, src: &[f64], dst: &mut Self::Buffer) -> DeviceResult<()>;

    /// Copy the start of `src` into `dst`.
    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [f64]) -> DeviceResult<()>;

    /// Create a timing event.
    fn create_event(&self) -> DeviceResult<Self::Event>;

    /// Enqueue `event` behind all previously submitted work.
    fn record_event(&self, event: &mut Self::Event) -> DeviceResult<()>;

    /// Block until `event` has been reached.
    fn synchronize_event(&self, event: &Self::Event) -> DeviceResult<()>;

    /// Milliseconds between two recorded, completed events.
    fn elapsed_ms(&self, start: &Self::Event, end: &Self::Event) -> DeviceResult<f32>;

    /// Dispatch `c[id] = a[id] + b[id]` over the grid in `config`, writing
    /// only indices below `config.element_count`. May return before the
    /// kernel finishes.
    fn launch_vector_add(
        &self,
        config: &LaunchConfig,
        a: &Self::Buffer,
        b: &Self::Buffer,
        c: &mut Self::Buffer,
    ) -> DeviceResult<()>;
}
