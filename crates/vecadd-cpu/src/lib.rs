//! CPU Backend for vecadd
//!
//! Emulates an accelerator on the host. The kernel grid is executed
//! literally (every block, every thread, guarded write), so the boundary
//! behaviour of a real launch can be tested without a GPU.

#![warn(missing_docs)]

mod accelerator;

pub use accelerator::{CpuAccelerator, CpuBuffer, CpuEvent, LaunchStats};
