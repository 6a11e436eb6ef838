//! Benchmark configuration.
//!
//! Configuration is read from an optional TOML file, then overridden field
//! by field by the command line, then validated once before the run starts.
//!
//! ```toml
//! elements = 268435456
//! threads_per_block = 256
//! tolerance = 1e-14
//!
//! [input]
//! seed = 42
//!
//! [device]
//! backend = "cuda"
//! ordinal = 0
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::host::InputSource;
use crate::launch::{LaunchConfig, DEFAULT_THREADS_PER_BLOCK};

/// Elements per buffer in the reference configuration (256 Mi).
pub const DEFAULT_ELEMENTS: usize = 256 * 1024 * 1024;

/// Relative tolerance on the mean of `C`.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-14;

/// Accelerator backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CUDA when compiled in and a device is present, CPU otherwise.
    #[default]
    Auto,
    /// Host-emulated accelerator.
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Auto => write!(f, "auto"),
            Backend::Cpu => write!(f, "cpu"),
            Backend::Cuda => write!(f, "cuda"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Backend::Auto),
            "cpu" | "host" => Ok(Backend::Cpu),
            "cuda" | "gpu" => Ok(Backend::Cuda),
            _ => Err(format!(
                "Unknown backend '{}'. Valid options: auto, cpu, cuda",
                s
            )),
        }
    }
}

/// Input generation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Seed for reproducible inputs.
    pub seed: Option<u64>,
    /// Use this value for every `r_i` instead of drawing.
    pub constant: Option<f64>,
}

impl InputConfig {
    /// Resolve to an input source. `constant` wins over `seed`.
    pub fn source(&self) -> InputSource {
        match (self.constant, self.seed) {
            (Some(r), _) => InputSource::Constant(r),
            (None, Some(seed)) => InputSource::Seeded(seed),
            (None, None) => InputSource::Entropy,
        }
    }
}

/// Device selection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Backend to run on.
    pub backend: Backend,
    /// Device ordinal. Defaults to `rank % device_count`.
    pub ordinal: Option<usize>,
}

/// Complete benchmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Elements per buffer.
    pub elements: usize,
    /// Threads per block for the kernel launch.
    pub threads_per_block: u32,
    /// Relative tolerance on the mean.
    pub tolerance: f64,
    /// Input generation.
    pub input: InputConfig,
    /// Device selection.
    pub device: DeviceConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            elements: DEFAULT_ELEMENTS,
            threads_per_block: DEFAULT_THREADS_PER_BLOCK,
            tolerance: DEFAULT_TOLERANCE,
            input: InputConfig::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BenchError::Config(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Builder method to set the element count.
    #[must_use]
    pub fn with_elements(mut self, elements: usize) -> Self {
        self.elements = elements;
        self
    }

    /// Builder method to set threads per block.
    #[must_use]
    pub fn with_threads_per_block(mut self, threads: u32) -> Self {
        self.threads_per_block = threads;
        self
    }

    /// Builder method to set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method to set the input source.
    #[must_use]
    pub fn with_input(mut self, source: InputSource) -> Self {
        self.input = match source {
            InputSource::Entropy => InputConfig::default(),
            InputSource::Seeded(seed) => InputConfig {
                seed: Some(seed),
                constant: None,
            },
            InputSource::Constant(r) => InputConfig {
                seed: None,
                constant: Some(r),
            },
        };
        self
    }

    /// Builder method to set the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.device.backend = backend;
        self
    }

    /// Size of one buffer in bytes.
    #[must_use]
    pub fn buffer_bytes(&self) -> usize {
        self.elements * std::mem::size_of::<f64>()
    }

    /// Check the configuration and derive the launch shape.
    pub fn validate(&self) -> Result<LaunchConfig> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(BenchError::Config(format!(
                "tolerance must be a non-negative finite number, got {}",
                self.tolerance
            )));
        }
        if let Some(r) = self.input.constant {
            if !r.is_finite() {
                return Err(BenchError::Config(format!(
                    "constant input must be finite, got {}",
                    r
                )));
            }
        }
        if self.elements.checked_mul(std::mem::size_of::<f64>()).is_none() {
            return Err(BenchError::Config(format!(
                "{} elements overflow the address space",
                self.elements
            )));
        }
        LaunchConfig::for_elements(self.elements, self.threads_per_block)
    }
}
