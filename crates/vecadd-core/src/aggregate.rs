//! Group-wide timing summary.

use serde::Serialize;
use tracing::debug;

use crate::error::GroupResult;
use crate::group::ProcessGroup;

/// Timings measured by one participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalTiming {
    /// Kernel time between the device events, in milliseconds.
    pub kernel_ms: f32,
    /// Wall-clock time from buffer setup to buffer teardown, in seconds.
    pub wall_seconds: f64,
}

/// Maxima over every participant, held by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupTiming {
    /// Slowest kernel, in milliseconds.
    pub max_kernel_ms: f32,
    /// Slowest participant wall time, in seconds.
    pub max_wall_seconds: f64,
}

impl GroupTiming {
    /// Slowest kernel, in seconds.
    pub fn max_kernel_seconds(&self) -> f64 {
        self.max_kernel_ms as f64 / 1000.0
    }
}

/// Reduce local timings across the group.
///
/// Issues exactly two collectives, kernel time first, then wall time. Returns
/// `Some` on the coordinator and `None` everywhere else.
pub fn reduce_timing<G: ProcessGroup + ?Sized>(
    group: &G,
    local: &LocalTiming,
) -> GroupResult<Option<GroupTiming>> {
    let max_kernel_ms = group.reduce_max_f32(local.kernel_ms)?;
    let max_wall_seconds = group.reduce_max_f64(local.wall_seconds)?;

    let summary = match (max_kernel_ms, max_wall_seconds) {
        (Some(max_kernel_ms), Some(max_wall_seconds)) => Some(GroupTiming {
            max_kernel_ms,
            max_wall_seconds,
        }),
        _ => None,
    };
    debug!(rank = group.context().rank, ?summary, "timings reduced");
    Ok(summary)
}
