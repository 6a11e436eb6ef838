//! CUDA device management.

use cudarc::driver::{CudaContext, CudaSlice, CudaStream};
use std::sync::Arc;

/// Type alias for Arc-wrapped CudaStream
type StreamHandle = Arc<CudaStream>;

use vecadd_core::error::{DeviceError, DeviceResult};

/// Wrapper around cudarc CudaContext.
pub struct CudaDevice {
    /// The underlying cudarc context.
    inner: Arc<CudaContext>,
    /// Default stream for operations.
    stream: StreamHandle,
    /// Device ordinal.
    ordinal: usize,
    /// Device name.
    name: String,
    /// Compute capability (major, minor).
    compute_capability: (u32, u32),
}

impl CudaDevice {
    /// Create a new CUDA device wrapper.
    pub fn new(ordinal: usize) -> DeviceResult<Self> {
        let inner = CudaContext::new(ordinal).map_err(|e| DeviceError::api("cuCtxCreate", e))?;

        let name = inner
            .name()
            .map_err(|e| DeviceError::api("cuDeviceGetName", e))?;

        let (major, minor) = inner
            .compute_capability()
            .map_err(|e| DeviceError::api("cuDeviceGetAttribute", e))?;

        let stream = inner.default_stream();

        Ok(Self {
            inner,
            stream,
            ordinal,
            name,
            compute_capability: (major as u32, minor as u32),
        })
    }

    /// Get device ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Get device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get compute capability as (major, minor).
    pub fn compute_capability(&self) -> (u32, u32) {
        self.compute_capability
    }

    /// Get the underlying cudarc context.
    pub fn inner(&self) -> &Arc<CudaContext> {
        &self.inner
    }

    /// Get the default stream.
    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }

    /// Make this device's context current on the calling thread.
    pub fn bind_to_thread(&self) -> DeviceResult<()> {
        self.inner
            .bind_to_thread()
            .map_err(|e| DeviceError::api("cuCtxSetCurrent", e))
    }

    /// Allocate device memory.
    pub fn alloc<T: cudarc::driver::DeviceRepr>(&self, len: usize) -> DeviceResult<CudaSlice<T>> {
        // Safety: Allocating uninitialized GPU memory is safe as long as we don't read
        // from it before initializing. The caller is responsible for initialization.
        unsafe {
            self.stream
                .alloc::<T>(len)
                .map_err(|e| DeviceError::Allocation {
                    bytes: len * std::mem::size_of::<T>(),
                    reason: e.to_string(),
                })
        }
    }

    /// Copy data from host into an existing device allocation.
    pub fn htod_copy_into<T: cudarc::driver::DeviceRepr>(
        &self,
        src: &[T],
        dst: &mut CudaSlice<T>,
    ) -> DeviceResult<()> {
        self.stream
            .memcpy_htod(src, dst)
            .map_err(|e| DeviceError::api("cuMemcpyHtoD", e))
    }

    /// Copy data from device into an existing host slice.
    pub fn dtoh_copy_into<T: cudarc::driver::DeviceRepr>(
        &self,
        src: &CudaSlice<T>,
        dst: &mut [T],
    ) -> DeviceResult<()> {
        self.stream
            .memcpy_dtoh(src, dst)
            .map_err(|e| DeviceError::api("cuMemcpyDtoH", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires CUDA hardware
    fn test_round_trip_is_bit_exact() {
        let device = CudaDevice::new(0).unwrap();
        let host: Vec<f64> = (0..4096).map(|i| (i as f64).sqrt()).collect();

        let mut d = device.alloc::<f64>(host.len()).unwrap();
        device.htod_copy_into(&host, &mut d).unwrap();
        let mut back = vec![0.0f64; host.len()];
        device.dtoh_copy_into(&d, &mut back).unwrap();

        assert!(host.iter().zip(&back).all(|(x, y)| x.to_bits() == y.to_bits()));
    }
}
