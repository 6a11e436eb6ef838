//! `Accelerator` implementation on a CUDA device.

use cudarc::driver::{CudaFunction, CudaSlice, PushKernelArg};
use tracing::{debug, info};

use vecadd_core::error::{DeviceError, DeviceResult};
use vecadd_core::launch::LaunchConfig;
use vecadd_core::{Accelerator, DeviceBuffer};

use crate::device::CudaDevice;
use crate::events::CudaEvent;
use crate::kernel::{VECTOR_ADD, VECTOR_ADD_CUDA};

/// Device buffer of `f64`, freed on drop.
pub struct CudaVecBuffer {
    data: CudaSlice<f64>,
}

impl DeviceBuffer for CudaVecBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }
}

/// A CUDA device with the `vector_add` kernel loaded.
pub struct CudaAccelerator {
    device: CudaDevice,
    kernel: CudaFunction,
    label: String,
}

impl CudaAccelerator {
    /// Open device `ordinal` and compile the kernel for it.
    pub fn new(ordinal: usize) -> DeviceResult<Self> {
        let device = CudaDevice::new(ordinal)?;

        let ptx = crate::compile_ptx(VECTOR_ADD_CUDA)?;
        let module = device
            .inner()
            .load_module(ptx)
            .map_err(|e| DeviceError::api("cuModuleLoadData", e))?;
        let kernel = module
            .load_function(VECTOR_ADD)
            .map_err(|e| DeviceError::api("cuModuleGetFunction", e))?;

        let (major, minor) = device.compute_capability();
        let label = format!("{} (cuda:{}, sm_{}{})", device.name(), ordinal, major, minor);
        info!("Initialized CUDA accelerator: {}", label);

        Ok(Self {
            device,
            kernel,
            label,
        })
    }

    /// Open the device for `rank`: `ordinal` if given, otherwise
    /// `rank % device_count` so ranks sharing a node spread across GPUs.
    pub fn for_rank(rank: usize, ordinal: Option<usize>) -> DeviceResult<Self> {
        let count = crate::cuda_device_count();
        if count == 0 {
            return Err(DeviceError::Unavailable(
                "no CUDA devices found".to_string(),
            ));
        }
        let ordinal = ordinal.unwrap_or(rank % count);
        if ordinal >= count {
            return Err(DeviceError::Unavailable(format!(
                "device {} requested, {} present",
                ordinal, count
            )));
        }
        debug!(rank, ordinal, count, "selected CUDA device");
        Self::new(ordinal)
    }

    /// The underlying device.
    pub fn device(&self) -> &CudaDevice {
        &self.device
    }
}

impl Accelerator for CudaAccelerator {
    type Buffer = CudaVecBuffer;
    type Event = CudaEvent;

    fn name(&self) -> &str {
        &self.label
    }

    fn alloc(&self, len: usize) -> DeviceResult<CudaVecBuffer> {
        Ok(CudaVecBuffer {
            data: self.device.alloc::<f64>(len)?,
        })
    }

    fn copy_to_device(&self, src: &[f64], dst: &mut CudaVecBuffer) -> DeviceResult<()> {
        if src.len() > dst.len() {
            return Err(DeviceError::OutOfBounds {
                required: src.len(),
                available: dst.len(),
            });
        }
        if src.len() == dst.len() {
            return self.device.htod_copy_into(src, &mut dst.data);
        }
        let mut head = dst.data.slice_mut(..src.len());
        self.device
            .stream()
            .memcpy_htod(src, &mut head)
            .map_err(|e| DeviceError::api("cuMemcpyHtoD", e))
    }

    fn copy_to_host(&self, src: &CudaVecBuffer, dst: &mut [f64]) -> DeviceResult<()> {
        if dst.len() > src.len() {
            return Err(DeviceError::OutOfBounds {
                required: dst.len(),
                available: src.len(),
            });
        }
        if dst.len() == src.len() {
            return self.device.dtoh_copy_into(&src.data, dst);
        }
        let head = src.data.slice(..dst.len());
        self.device
            .stream()
            .memcpy_dtoh(&head, dst)
            .map_err(|e| DeviceError::api("cuMemcpyDtoH", e))
    }

    fn create_event(&self) -> DeviceResult<CudaEvent> {
        self.device.bind_to_thread()?;
        CudaEvent::new()
    }

    fn record_event(&self, event: &mut CudaEvent) -> DeviceResult<()> {
        // Safety: the stream belongs to this device's context, which is
        // bound to the thread.
        unsafe { event.record(self.device.stream().cu_stream()) }
    }

    fn synchronize_event(&self, event: &CudaEvent) -> DeviceResult<()> {
        event.synchronize()
    }

    fn elapsed_ms(&self, start: &CudaEvent, end: &CudaEvent) -> DeviceResult<f32> {
        CudaEvent::elapsed_ms(start, end)
    }

    fn launch_vector_add(
        &self,
        config: &LaunchConfig,
        a: &CudaVecBuffer,
        b: &CudaVecBuffer,
        c: &mut CudaVecBuffer,
    ) -> DeviceResult<()> {
        let n = config.element_count;
        for available in [a.len(), b.len(), c.len()] {
            if available < n {
                return Err(DeviceError::OutOfBounds {
                    required: n,
                    available,
                });
            }
        }

        let cfg = cudarc::driver::LaunchConfig {
            grid_dim: config.grid_dim(),
            block_dim: config.block_dim(),
            shared_mem_bytes: 0,
        };
        let n_arg = n as u64;

        let stream = self.device.stream();
        let mut builder = stream.launch_builder(&self.kernel);
        builder.arg(&a.data);
        builder.arg(&b.data);
        builder.arg(&mut c.data);
        builder.arg(&n_arg);

        // Safety: argument types match the kernel signature and every buffer
        // holds at least `n` elements, the bound the kernel guards on.
        unsafe { builder.launch(cfg) }
            .map(|_| ())
            .map_err(|e| DeviceError::api("cuLaunchKernel", e))
    }
}
