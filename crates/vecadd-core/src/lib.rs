//! # vecadd core
//!
//! Orchestration for a distributed vector-addition benchmark: every
//! participant seeds `A` and `B` on the host, offloads `C = A + B` to an
//! accelerator, checks the mean of `C` against 1, and MAX-reduces its kernel
//! and wall-clock times to the coordinator.
//!
//! The accelerator and the process transport are collaborators behind the
//! [`Accelerator`] and [`ProcessGroup`] traits. Backends live in
//! `vecadd-cpu` and `vecadd-cuda`.
//!
//! ## Example
//!
//! ```ignore
//! use vecadd_core::prelude::*;
//!
//! let config = BenchConfig::default().with_elements(1 << 20);
//! let outcome = Benchmark::new(config, &accelerator, &SoloGroup)?.run()?;
//! assert!(outcome.verification.passed);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accelerator;
pub mod aggregate;
pub mod bench;
pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod host;
pub mod launch;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::accelerator::{Accelerator, DeviceBuffer};
    pub use crate::aggregate::{reduce_timing, GroupTiming, LocalTiming};
    pub use crate::bench::{Benchmark, RunOutcome};
    pub use crate::config::{Backend, BenchConfig, DeviceConfig, InputConfig};
    pub use crate::engine::{DeviceExecutor, DeviceRun};
    pub use crate::error::{
        BenchError, DeviceError, DeviceResult, GroupError, GroupResult, Result,
    };
    pub use crate::group::{
        GroupContext, ProcessGroup, SoloGroup, ThreadGroup, ThreadMember, COORDINATOR_RANK,
    };
    pub use crate::host::{HostBuffers, InputSource};
    pub use crate::launch::LaunchConfig;
    pub use crate::verify::{verify, Verification, EXPECTED_MEAN};
}

pub use accelerator::{Accelerator, DeviceBuffer};
pub use group::{GroupContext, ProcessGroup};
