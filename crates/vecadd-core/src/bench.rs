//! One participant's benchmark run.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::accelerator::Accelerator;
use crate::aggregate::{reduce_timing, GroupTiming, LocalTiming};
use crate::config::BenchConfig;
use crate::engine::DeviceExecutor;
use crate::error::{BenchError, Result};
use crate::group::{GroupContext, ProcessGroup};
use crate::host::HostBuffers;
use crate::launch::LaunchConfig;
use crate::verify::{verify, Verification};

/// Everything one participant knows after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Rank and size.
    #[serde(skip)]
    pub context: GroupContext,
    /// Bytes per buffer.
    pub buffer_bytes: usize,
    /// Launch shape.
    #[serde(skip)]
    pub launch: LaunchConfig,
    /// Local correctness check.
    pub verification: Verification,
    /// Local timings.
    pub local: LocalTiming,
    /// Group maxima; only the coordinator has them.
    pub group: Option<GroupTiming>,
}

/// A configured run bound to an accelerator and a process group.
pub struct Benchmark<'a, A: Accelerator, G: ProcessGroup + ?Sized> {
    config: BenchConfig,
    launch: LaunchConfig,
    accelerator: &'a A,
    group: &'a G,
}

impl<'a, A: Accelerator, G: ProcessGroup + ?Sized> Benchmark<'a, A, G> {
    /// Validate `config` and bind it to the collaborators.
    pub fn new(config: BenchConfig, accelerator: &'a A, group: &'a G) -> Result<Self> {
        let launch = config.validate()?;
        Ok(Self {
            config,
            launch,
            accelerator,
            group,
        })
    }

    /// Launch shape this run will use.
    pub fn launch(&self) -> &LaunchConfig {
        &self.launch
    }

    /// Run once.
    ///
    /// Order: seed host buffers, execute on the device, verify locally,
    /// release host buffers, stop the wall clock, then the two reductions.
    /// A failed verification returns before the reductions, so this rank
    /// never contributes to them.
    pub fn run(&self) -> Result<RunOutcome> {
        let context = self.group.context();
        let span = info_span!("rank", rank = context.rank);
        let _enter = span.enter();

        let started = Instant::now();
        let (kernel_ms, verification) = {
            let mut host = HostBuffers::generate(self.config.elements, self.config.input.source())?;
            let run = DeviceExecutor::new(self.accelerator).execute(&mut host, &self.launch)?;

            let verification = verify(host.c(), self.config.tolerance);
            if !verification.passed {
                warn!(
                    mean = verification.mean,
                    relative_difference = verification.relative_difference,
                    "verification failed"
                );
                return Err(BenchError::Verification {
                    rank: context.rank,
                    relative_difference: verification.relative_difference,
                    tolerance: verification.tolerance,
                });
            }

            host.release();
            (run.kernel_ms, verification)
        };
        let local = LocalTiming {
            kernel_ms,
            wall_seconds: started.elapsed().as_secs_f64(),
        };
        info!(
            kernel_ms = local.kernel_ms,
            wall_seconds = local.wall_seconds,
            "local run complete"
        );

        let group = reduce_timing(self.group, &local)?;

        Ok(RunOutcome {
            context,
            buffer_bytes: self.config.buffer_bytes(),
            launch: self.launch,
            verification,
            local,
            group,
        })
    }
}
