//! Error types for the benchmark.

use thiserror::Error;

/// Result type alias used across the workspace.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Result type alias for accelerator calls.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Result type alias for collective operations.
pub type GroupResult<T> = std::result::Result<T, GroupError>;

/// Exit status for a run that completed and verified.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for a run whose result exceeded the tolerance.
pub const EXIT_VERIFICATION_FAILED: u8 = 1;
/// Exit status for an unrecoverable accelerator error.
pub const EXIT_DEVICE_ERROR: u8 = 2;
/// Exit status for a failed host allocation.
pub const EXIT_HOST_ALLOCATION: u8 = 3;
/// Exit status for a failed collective.
pub const EXIT_GROUP_ERROR: u8 = 4;
/// Exit status for a rejected configuration.
pub const EXIT_CONFIG_ERROR: u8 = 5;

/// Errors reported by an accelerator backend.
///
/// Every variant that comes from a driver call names the call site so the
/// binary can log it before exiting.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Backend not compiled in or no device present.
    #[error("Accelerator unavailable: {0}")]
    Unavailable(String),

    /// A driver call returned a non-success status.
    #[error("{call} failed: {reason}")]
    Api {
        /// Driver entry point that failed.
        call: &'static str,
        /// Driver-provided description.
        reason: String,
    },

    /// Device memory allocation failed.
    #[error("Device allocation of {bytes} bytes failed: {reason}")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Driver-provided description.
        reason: String,
    },

    /// Kernel source failed to compile.
    #[error("Kernel compilation failed: {0}")]
    Compile(String),

    /// A transfer or launch would reach past the end of a buffer.
    #[error("Out of bounds: {required} elements required, {available} available")]
    OutOfBounds {
        /// Elements the operation needs.
        required: usize,
        /// Elements the buffer holds.
        available: usize,
    },

    /// An event or timer was used out of order.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state.
        expected: String,
        /// Actual state.
        actual: String,
    },
}

impl DeviceError {
    /// Shorthand for a failed driver call.
    pub fn api(call: &'static str, reason: impl std::fmt::Display) -> Self {
        DeviceError::Api {
            call,
            reason: reason.to_string(),
        }
    }

    /// The driver call this error originated from, if any.
    pub fn call_site(&self) -> Option<&'static str> {
        match self {
            DeviceError::Api { call, .. } => Some(call),
            _ => None,
        }
    }
}

/// Errors reported by a process group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// A member left before contributing to a collective its peers are in.
    #[error("Rank {rank} left the group before reaching the collective")]
    PeerDeparted {
        /// Rank of the departed member.
        rank: usize,
    },

    /// The underlying transport reported an error.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Top-level benchmark error.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Host buffer allocation failed.
    #[error("Host allocation of {bytes} bytes failed")]
    HostAllocation {
        /// Requested size in bytes.
        bytes: usize,
    },

    /// Accelerator error.
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Collective error.
    #[error("Process group error: {0}")]
    Group(#[from] GroupError),

    /// The computed mean is outside the tolerance.
    #[error(
        "In rank {rank}: Test failed! relative difference {relative_difference:e} exceeds tolerance {tolerance:e}"
    )]
    Verification {
        /// Rank that failed.
        rank: usize,
        /// Observed relative difference.
        relative_difference: f64,
        /// Configured tolerance.
        tolerance: f64,
    },
}

impl BenchError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BenchError::Verification { .. } => EXIT_VERIFICATION_FAILED,
            BenchError::Device(_) => EXIT_DEVICE_ERROR,
            BenchError::HostAllocation { .. } => EXIT_HOST_ALLOCATION,
            BenchError::Group(_) => EXIT_GROUP_ERROR,
            BenchError::Config(_) => EXIT_CONFIG_ERROR,
        }
    }
}
