//! vecadd - distributed GPU vector-addition benchmark.
//!
//! Every process seeds two buffers so that `A[i] + B[i] = 1`, adds them on an
//! accelerator, checks that the mean of the result is 1, and MAX-reduces its
//! kernel time and wall time to rank 0, which prints the report.
//!
//! # Examples
//!
//! ```bash
//! # Single process, default 256 Mi elements
//! vecadd
//!
//! # Four ranks over MPI, one GPU each
//! mpirun -np 4 vecadd --backend cuda
//!
//! # Small deterministic run with JSON output
//! vecadd --elements 1048576 --seed 42 --format json
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vecadd::Execution;
use vecadd_core::config::{Backend, BenchConfig};
use vecadd_core::error::EXIT_SUCCESS;
use vecadd_core::group::ProcessGroup;

mod error;
#[cfg(feature = "mpi")]
mod mpi_group;
mod report;

use error::{CliError, CliResult};
use report::{OutputFormat, Report};

/// Distributed GPU vector-addition benchmark
#[derive(Parser, Debug)]
#[command(name = "vecadd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Elements per buffer
    #[arg(short = 'n', long)]
    elements: Option<usize>,

    /// Threads per block for the kernel launch
    #[arg(long)]
    threads_per_block: Option<u32>,

    /// Relative tolerance on the mean
    #[arg(long)]
    tolerance: Option<f64>,

    /// Seed for reproducible inputs (default: fresh entropy)
    #[arg(long, conflicts_with = "constant_input")]
    seed: Option<u64>,

    /// Use the same r for every element
    #[arg(long)]
    constant_input: Option<f64>,

    /// Accelerator backend (auto, cpu, cuda)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Device ordinal (default: rank % device count)
    #[arg(short, long)]
    device: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl Cli {
    /// Configuration file (or defaults) with flag overrides applied.
    fn bench_config(&self) -> CliResult<BenchConfig> {
        let mut config = match &self.config {
            Some(path) => BenchConfig::load(path)?,
            None => BenchConfig::default(),
        };

        if let Some(elements) = self.elements {
            config.elements = elements;
        }
        if let Some(threads) = self.threads_per_block {
            config.threads_per_block = threads;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(seed) = self.seed {
            config.input.seed = Some(seed);
            config.input.constant = None;
        }
        if let Some(r) = self.constant_input {
            config.input.constant = Some(r);
        }
        if let Some(backend) = self.backend {
            config.device.backend = backend;
        }
        if let Some(ordinal) = self.device {
            config.device.ordinal = Some(ordinal);
        }

        config.validate()?;
        Ok(config)
    }
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(e: &CliError) {
    if let Some(call) = e.call_site() {
        error!(call, "device API call failed");
    }
    eprintln!("{} {}", "Error:".red().bold(), e);
}

fn execute<G: ProcessGroup + ?Sized>(cli: &Cli, group: &G) -> CliResult<()> {
    execute_with(cli, group, vecadd::run::<G>)
}

/// Load the config, run it through `runner` and print the coordinator report.
fn execute_with<G, F>(cli: &Cli, group: &G, runner: F) -> CliResult<()>
where
    G: ProcessGroup + ?Sized,
    F: FnOnce(BenchConfig, &G) -> vecadd_core::error::Result<Execution>,
{
    let config = cli.bench_config()?;
    let context = group.context();

    let mut out = std::io::stdout().lock();
    if context.is_coordinator() {
        if cli.format == OutputFormat::Text {
            writeln!(out, "number of ranks: {}", context.size)?;
        } else {
            info!(ranks = context.size, "starting benchmark");
        }
    }

    let execution = runner(config, group)?;

    if let Some(report) = Report::from_execution(&execution) {
        writeln!(out, "{}", report.render(cli.format)?)?;
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run(cli: &Cli) -> CliResult<()> {
    let group = mpi_group::MpiGroup::init()?;
    let result = execute(cli, &group);
    if let Err(e) = &result {
        // Peers may be blocked in a reduction this rank will never join.
        if group.context().size > 1 {
            report_error(e);
            group.abort(e.exit_code());
        }
    }
    result
}

#[cfg(not(feature = "mpi"))]
fn run(cli: &Cli) -> CliResult<()> {
    execute(cli, &vecadd_core::group::SoloGroup)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    ExitCode::from(exit_status(run(&cli)))
}

fn exit_status(result: CliResult<()>) -> u8 {
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecadd::prelude::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vecadd").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).bench_config().unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn test_flag_overrides() {
        let cli = parse(&[
            "-n",
            "1024",
            "--threads-per-block",
            "128",
            "--tolerance",
            "1e-10",
            "--seed",
            "9",
            "--backend",
            "cpu",
            "--device",
            "1",
            "--format",
            "json",
        ]);
        let config = cli.bench_config().unwrap();
        assert_eq!(config.elements, 1024);
        assert_eq!(config.threads_per_block, 128);
        assert_eq!(config.tolerance, 1e-10);
        assert_eq!(config.input.source(), InputSource::Seeded(9));
        assert_eq!(config.device.backend, Backend::Cpu);
        assert_eq!(config.device.ordinal, Some(1));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_seed_conflicts_with_constant() {
        let result = Cli::try_parse_from(["vecadd", "--seed", "1", "--constant-input", "0.5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = parse(&["--elements", "0"]).bench_config().unwrap_err();
        assert_eq!(err.exit_code(), 5);

        let err = parse(&["--threads-per-block", "2048"]).bench_config().unwrap_err();
        assert_eq!(err.exit_code(), 5);

        assert!(Cli::try_parse_from(["vecadd", "--backend", "opencl"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = parse(&["--config", "/nonexistent/vecadd.toml"])
            .bench_config()
            .unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    /// CPU accelerator that adds 0.5 to every element it copies back.
    struct SkewedAccelerator(CpuAccelerator);

    impl Accelerator for SkewedAccelerator {
        type Buffer = <CpuAccelerator as Accelerator>::Buffer;
        type Event = <CpuAccelerator as Accelerator>::Event;

        fn name(&self) -> &str {
            "skewed cpu"
        }

        fn alloc(&self, len: usize) -> DeviceResult<Self::Buffer> {
            self.0.alloc(len)
        }

        fn copy_to_device(&self, src: &[f64], dst: &mut Self::Buffer) -> DeviceResult<()> {
            self.0.copy_to_device(src, dst)
        }

        fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [f64]) -> DeviceResult<()> {
            self.0.copy_to_host(src, dst)?;
            dst.iter_mut().for_each(|x| *x += 0.5);
            Ok(())
        }

        fn create_event(&self) -> DeviceResult<Self::Event> {
            self.0.create_event()
        }

        fn record_event(&self, event: &mut Self::Event) -> DeviceResult<()> {
            self.0.record_event(event)
        }

        fn synchronize_event(&self, event: &Self::Event) -> DeviceResult<()> {
            self.0.synchronize_event(event)
        }

        fn elapsed_ms(&self, start: &Self::Event, end: &Self::Event) -> DeviceResult<f32> {
            self.0.elapsed_ms(start, end)
        }

        fn launch_vector_add(
            &self,
            config: &LaunchConfig,
            a: &Self::Buffer,
            b: &Self::Buffer,
            c: &mut Self::Buffer,
        ) -> DeviceResult<()> {
            self.0.launch_vector_add(config, a, b, c)
        }
    }

    fn run_skewed(config: BenchConfig, group: &SoloGroup) -> vecadd_core::error::Result<Execution> {
        let accelerator = SkewedAccelerator(CpuAccelerator::new());
        let outcome = Benchmark::new(config, &accelerator, group)?.run()?;
        Ok(Execution {
            backend: Backend::Cpu,
            device: accelerator.name().to_string(),
            outcome,
        })
    }

    #[test]
    fn test_successful_run_exits_zero() {
        let cli = parse(&["-n", "1024", "--constant-input", "0", "--backend", "cpu"]);
        assert_eq!(exit_status(execute(&cli, &SoloGroup)), 0);
    }

    #[test]
    fn test_verification_failure_exits_one() {
        let cli = parse(&["-n", "1024", "--constant-input", "0", "--backend", "cpu"]);
        let err = execute_with(&cli, &SoloGroup, run_skewed).unwrap_err();
        assert!(matches!(
            err,
            CliError::Bench(BenchError::Verification { rank: 0, .. })
        ));
        assert_eq!(err.exit_code(), 1);

        assert_eq!(exit_status(execute_with(&cli, &SoloGroup, run_skewed)), 1);
    }

    #[test]
    fn test_config_error_exits_five() {
        let cli = parse(&["-n", "0"]);
        assert_eq!(exit_status(execute(&cli, &SoloGroup)), 5);
    }
}
