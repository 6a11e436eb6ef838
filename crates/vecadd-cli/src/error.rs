//! Error types for the vecadd CLI.

use thiserror::Error;
use vecadd_core::error::{BenchError, GroupError, EXIT_CONFIG_ERROR};

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// The benchmark itself failed.
    #[error(transparent)]
    Bench(#[from] BenchError),

    /// Writing the report failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The report could not be serialized.
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

impl From<GroupError> for CliError {
    fn from(e: GroupError) -> Self {
        CliError::Bench(BenchError::Group(e))
    }
}

impl CliError {
    /// Process exit status.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Bench(e) => e.exit_code(),
            CliError::Io(_) | CliError::Report(_) => EXIT_CONFIG_ERROR,
        }
    }

    /// Driver call that failed, for device errors.
    pub fn call_site(&self) -> Option<&'static str> {
        match self {
            CliError::Bench(BenchError::Device(e)) => e.call_site(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecadd_core::error::DeviceError;

    #[test]
    fn test_exit_code_passthrough() {
        let err = CliError::from(BenchError::Verification {
            rank: 3,
            relative_difference: 0.5,
            tolerance: 1e-14,
        });
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("In rank 3: Test failed!"));

        let err = CliError::from(GroupError::Transport("lost".into()));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_call_site() {
        let err = CliError::from(BenchError::from(DeviceError::api(
            "cuMemAlloc",
            "out of memory",
        )));
        assert_eq!(err.call_site(), Some("cuMemAlloc"));
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(BenchError::Config("bad".into()));
        assert_eq!(err.call_site(), None);
    }
}
