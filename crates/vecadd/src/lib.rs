//! # vecadd
//!
//! Distributed GPU vector-addition benchmark.
//!
//! Every participant seeds `A[i] = sin(r)^2` and `B[i] = cos(r)^2`, offloads
//! `C = A + B` to an accelerator, checks that the mean of `C` is 1 within
//! tolerance, and MAX-reduces its kernel time and wall time to rank 0.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vecadd::prelude::*;
//!
//! let config = BenchConfig::default()
//!     .with_elements(1 << 24)
//!     .with_backend(Backend::Auto);
//! let execution = vecadd::run(config, &SoloGroup)?;
//! if let Some(group) = execution.outcome.group {
//!     println!("max kernel: {:.6} s", group.max_kernel_seconds());
//! }
//! ```
//!
//! ## Backends
//!
//! - **CPU** (`vecadd-cpu`): host emulation of the kernel grid, always built
//! - **CUDA** (`vecadd-cuda`, feature `cuda`): NVIDIA GPUs through cudarc

#![warn(missing_docs)]

use tracing::{info, warn};

use vecadd_core::prelude::*;
use vecadd_cpu::CpuAccelerator;

/// Prelude for convenient imports.
pub mod prelude {
    pub use vecadd_core::prelude::*;
    pub use vecadd_cpu::CpuAccelerator;

    #[cfg(feature = "cuda")]
    pub use vecadd_cuda::CudaAccelerator;

    pub use crate::{resolve_backend, run, Execution};
}

/// A finished run and where it ran.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Backend actually used.
    pub backend: Backend,
    /// Device description.
    pub device: String,
    /// Run results.
    pub outcome: RunOutcome,
}

/// Resolve `Auto` to a concrete backend and reject backends that are not
/// usable in this build or on this machine.
pub fn resolve_backend(requested: Backend) -> Result<Backend> {
    match requested {
        Backend::Cpu => Ok(Backend::Cpu),
        Backend::Cuda => {
            if cfg!(not(feature = "cuda")) {
                return Err(DeviceError::Unavailable(
                    "CUDA support not compiled in; rebuild with --features cuda".to_string(),
                )
                .into());
            }
            if !vecadd_cuda::is_cuda_available() {
                return Err(DeviceError::Unavailable("no CUDA devices found".to_string()).into());
            }
            Ok(Backend::Cuda)
        }
        Backend::Auto => {
            if vecadd_cuda::is_cuda_available() {
                Ok(Backend::Cuda)
            } else {
                warn!("No CUDA device available, falling back to CPU backend");
                Ok(Backend::Cpu)
            }
        }
    }
}

/// Run the benchmark once on the configured backend.
pub fn run<G: ProcessGroup + ?Sized>(config: BenchConfig, group: &G) -> Result<Execution> {
    config.validate()?;
    let backend = resolve_backend(config.device.backend)?;
    match backend {
        Backend::Cuda => run_cuda(config, group),
        _ => {
            let accelerator = CpuAccelerator::new();
            run_on(Backend::Cpu, config, &accelerator, group)
        }
    }
}

#[cfg(feature = "cuda")]
fn run_cuda<G: ProcessGroup + ?Sized>(config: BenchConfig, group: &G) -> Result<Execution> {
    let accelerator =
        vecadd_cuda::CudaAccelerator::for_rank(group.context().rank, config.device.ordinal)?;
    run_on(Backend::Cuda, config, &accelerator, group)
}

#[cfg(not(feature = "cuda"))]
fn run_cuda<G: ProcessGroup + ?Sized>(_config: BenchConfig, _group: &G) -> Result<Execution> {
    Err(DeviceError::Unavailable("CUDA feature not enabled".to_string()).into())
}

fn run_on<A: Accelerator, G: ProcessGroup + ?Sized>(
    backend: Backend,
    config: BenchConfig,
    accelerator: &A,
    group: &G,
) -> Result<Execution> {
    info!(
        rank = group.context().rank,
        device = accelerator.name(),
        elements = config.elements,
        "starting run"
    );
    let outcome = Benchmark::new(config, accelerator, group)?.run()?;
    Ok(Execution {
        backend,
        device: accelerator.name().to_string(),
        outcome,
    })
}
