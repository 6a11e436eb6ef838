//! Coordinator report.

use std::fmt;

use serde::Serialize;
use vecadd::Execution;
use vecadd_core::config::Backend;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned `key = value` lines.
    Text,
    /// A single JSON object.
    Json,
}

/// Group-wide results, printed by the coordinator only.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Number of participants.
    pub ranks: usize,
    /// Backend the coordinator ran on.
    pub backend: Backend,
    /// Coordinator's device.
    pub device: String,
    /// Coordinator's mean of `C`.
    pub mean: f64,
    /// `|mean - 1|`.
    pub relative_difference: f64,
    /// Tolerance applied.
    pub tolerance: f64,
    /// Bytes per buffer.
    pub buffer_bytes: usize,
    /// Slowest kernel across the group.
    pub max_gpu_seconds: f64,
    /// Slowest wall time across the group.
    pub max_wall_seconds: f64,
}

impl Report {
    /// Build the report, or `None` on ranks that hold no group results.
    pub fn from_execution(execution: &Execution) -> Option<Self> {
        let outcome = &execution.outcome;
        let group = outcome.group?;
        Some(Self {
            ranks: outcome.context.size,
            backend: execution.backend,
            device: execution.device.clone(),
            mean: outcome.verification.mean,
            relative_difference: outcome.verification.relative_difference,
            tolerance: outcome.verification.tolerance,
            buffer_bytes: outcome.buffer_bytes,
            max_gpu_seconds: group.max_kernel_seconds(),
            max_wall_seconds: group.max_wall_seconds,
        })
    }

    /// Render in `format`.
    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(self),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Result              = {:.16}", self.mean)?;
        writeln!(f, "Relative difference = {:.16}", self.relative_difference)?;
        writeln!(f, "Tolerance           = {:.16}", self.tolerance)?;
        writeln!(f, "Array buffer size   = {}", self.buffer_bytes)?;
        writeln!(f, "Max GPU time (s)    = {:.6}", self.max_gpu_seconds)?;
        write!(f, "Max wall time (s)   = {:.6}", self.max_wall_seconds)
    }
}
