//! Command-line front-end for the harness.
//!
//! The binary stays a thin wrapper around [`run`]. Configuration is resolved
//! once by `ortho_config` (defaults, `.evstress.toml`, `EVSTRESS_*`
//! environment variables, then the command line) into a [`ResolvedCli`].
//! [`run_with_cli`] turns it into [`RunSettings`], expands those into one
//! [`WorkerJob`] per worker and hands them to the [`LoadOrchestrator`].

use std::{
    ffi::OsString,
    net::SocketAddr,
    num::NonZeroUsize,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use ortho_config::OrthoConfig;
use thiserror::Error;
use tracing::{info, warn};

pub use cli_defs::{Cli, Commands, HarnessConfig};

use crate::{
    metrics::{AggregateStats, MetricsAggregator},
    orchestrator::{LoadOrchestrator, Target, WorkerJob},
    payload::{PayloadSizeError, PayloadSizes},
    scenario::{CATALOG, ScenarioDescriptor, ScenarioParams, ScenarioSpec, find},
    supervisor::BackoffPolicy,
    transport::CONNECT_TIMEOUT,
};

/// Invalid harness configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The payload size list could not be parsed.
    #[error("invalid --payload-sizes: {0}")]
    PayloadSizes(#[from] PayloadSizeError),
    /// A scenario name is not in the catalogue.
    #[error("unknown scenario '{0}' (run `evstress list`)")]
    UnknownScenario(String),
    /// The scenario list is empty.
    #[error("no scenario selected")]
    NoScenario,
    /// The pool size is zero.
    #[error("--pool-size must be at least 1")]
    ZeroPoolSize,
    /// The worker count is zero.
    #[error("--workers must be at least 1")]
    ZeroWorkers,
    /// Worker ids would overflow the event id space.
    #[error("--id-stride {stride} overflows event ids for {workers} workers")]
    IdSpaceOverflow {
        /// Configured stride.
        stride: u64,
        /// Configured workers.
        workers: u32,
    },
}

/// Command line with its configuration layers already merged.
#[derive(Debug, Clone)]
pub struct ResolvedCli {
    /// Merged harness configuration.
    pub config: HarnessConfig,
    /// Optional subcommand.
    pub command: Option<Commands>,
}

/// Validated run parameters, independent of address resolution.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Number of workers.
    pub workers: u32,
    /// Concurrent worker limit.
    pub pool_size: NonZeroUsize,
    /// Scenarios assigned round-robin to workers.
    pub scenarios: Vec<&'static ScenarioDescriptor>,
    /// Knobs shared by every scenario; the seed is the run's base seed.
    pub params: ScenarioParams,
    /// Event id partition width per worker, never narrower than the largest
    /// planned scenario.
    pub id_stride: u64,
    /// Run deadline.
    pub deadline: Duration,
    /// Reconnect backoff for supervised workers.
    pub backoff: BackoffPolicy,
    /// Per-write timeout.
    pub io_timeout: Duration,
}

impl RunSettings {
    /// Validate `cfg`. A zero seed is replaced by `fallback_seed`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] describing the first invalid setting.
    pub fn from_config(cfg: &HarnessConfig, fallback_seed: u64) -> Result<Self, ConfigError> {
        if cfg.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        let pool_size = usize::try_from(cfg.pool_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ConfigError::ZeroPoolSize)?;
        let payload_sizes: PayloadSizes = cfg.payload_sizes.parse()?;
        let scenarios = cfg
            .scenario
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| find(name).ok_or_else(|| ConfigError::UnknownScenario(name.to_owned())))
            .collect::<Result<Vec<_>, _>>()?;
        if scenarios.is_empty() {
            return Err(ConfigError::NoScenario);
        }
        let seed = if cfg.seed == 0 { fallback_seed } else { cfg.seed };
        let params = ScenarioParams {
            events: cfg.events_per_worker,
            payload_sizes,
            seed,
            pace: Duration::from_micros(cfg.pace_us),
            overflow_capacity: cfg.overflow_capacity,
            duplicate_interval: cfg.duplicate_interval,
        };
        let id_stride = widen_stride(cfg.id_stride, &scenarios, &params);
        if id_stride.checked_mul(u64::from(cfg.workers)).is_none() {
            return Err(ConfigError::IdSpaceOverflow {
                stride: id_stride,
                workers: cfg.workers,
            });
        }
        Ok(Self {
            workers: cfg.workers,
            pool_size,
            scenarios,
            params,
            id_stride,
            deadline: Duration::from_secs(cfg.timeout_secs),
            backoff: BackoffPolicy::fixed(Duration::from_millis(cfg.backoff_ms)),
            io_timeout: Duration::from_millis(cfg.io_timeout_ms),
        })
    }

    /// One job per worker, with per-worker seeds and disjoint id ranges.
    #[must_use]
    pub fn jobs(&self, tcp: SocketAddr, udp: SocketAddr) -> Vec<WorkerJob> {
        let target = Target {
            tcp,
            udp,
            connect_timeout: CONNECT_TIMEOUT,
            io_timeout: self.io_timeout,
            backoff: self.backoff,
        };
        (0..self.workers)
            .zip(self.scenarios.iter().cycle())
            .map(|(worker, descriptor)| {
                let params = ScenarioParams {
                    seed: self.params.seed.wrapping_add(u64::from(worker)),
                    ..self.params.clone()
                };
                let mut spec = descriptor.build(&params);
                spec.id_base = u64::from(worker).saturating_mul(self.id_stride);
                WorkerJob {
                    worker_id: usize::try_from(worker).unwrap_or(usize::MAX),
                    spec,
                    target,
                }
            })
            .collect()
    }
}

/// Raise `stride` to the largest event count any selected scenario plans, so
/// that `worker * stride + index` ranges never overlap.
fn widen_stride(
    stride: u64,
    scenarios: &[&'static ScenarioDescriptor],
    params: &ScenarioParams,
) -> u64 {
    let widest = scenarios
        .iter()
        .map(|descriptor| descriptor.build(params))
        .max_by_key(|spec| spec.count);
    match widest {
        Some(ScenarioSpec { name, count, .. }) if count > stride => {
            warn!(
                scenario = %name,
                count,
                configured = stride,
                "widening --id-stride to keep worker id ranges disjoint"
            );
            count
        }
        _ => stride,
    }
}

/// Parse CLI arguments and execute the requested command or load run.
///
/// # Errors
///
/// Returns any error emitted while merging configuration, resolving the
/// receiver address or running the workers.
pub async fn run() -> Result<ExitCode> {
    let cli = load_cli(std::env::args_os())?;
    run_with_cli(cli).await
}

/// Parse `argv` and merge the configuration layers over them.
///
/// Subcommands take the parsed flags as they are; a load run merges defaults,
/// the config file and the environment underneath the command line.
///
/// Malformed arguments, `--help` and `--version` exit the process the way
/// `clap` always does.
///
/// # Errors
///
/// Returns an error when a configuration layer cannot be read.
pub fn load_cli<I, T>(argv: I) -> Result<ResolvedCli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let Cli { config: flags, command } =
        Cli::try_parse_from(args.clone()).unwrap_or_else(|err| err.exit());
    let config = if command.is_some() {
        flags
    } else {
        HarnessConfig::load_from_iter(args).context("failed to load configuration")?
    };
    Ok(ResolvedCli { config, command })
}

/// Execute the harness with an already resolved [`ResolvedCli`].
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_cli(cli: ResolvedCli) -> Result<ExitCode> {
    let ResolvedCli { config: cfg, command } = cli;
    if let Some(Commands::List) = command {
        print_catalog();
        return Ok(ExitCode::SUCCESS);
    }
    let settings = RunSettings::from_config(&cfg, clock_seed())?;
    let tcp = resolve(&cfg.host, cfg.tcp_port).await?;
    let udp = resolve(&cfg.host, cfg.udp_port).await?;
    info!(
        %tcp,
        %udp,
        workers = settings.workers,
        pool_size = settings.pool_size.get(),
        seed = settings.params.seed,
        "starting load run"
    );

    let metrics = Arc::new(MetricsAggregator::new());
    let orchestrator = LoadOrchestrator::new(Arc::clone(&metrics)).with_deadline(settings.deadline);
    let stats = orchestrator
        .run(settings.pool_size, settings.jobs(tcp, udp))
        .await?;
    report(&stats, orchestrator.peak_concurrency());
    Ok(exit_code(&stats))
}

/// Non-zero when any worker lost its connection before finishing its sends.
#[must_use]
pub fn exit_code(stats: &AggregateStats) -> ExitCode {
    if stats.connections_held() {
        return ExitCode::SUCCESS;
    }
    warn!(
        connect_failed = stats.outcomes.connect_failed,
        transport_failed = stats.outcomes.transport_failed,
        "some workers lost the receiver before finishing"
    );
    ExitCode::FAILURE
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("{host}:{port} resolved to no address"))
}

fn clock_seed() -> u64 { crate::payload::now_millis().unsigned_abs() }

fn report(stats: &AggregateStats, peak: usize) {
    info!(
        workers = stats.workers,
        attempted = stats.attempted,
        sent = stats.sent,
        errors = stats.errors,
        elapsed = ?stats.elapsed,
        throughput = stats.throughput(),
        peak_concurrency = peak,
        completed = stats.outcomes.completed,
        transport_failed = stats.outcomes.transport_failed,
        connect_failed = stats.outcomes.connect_failed,
        abandoned = stats.outcomes.abandoned,
        "run finished"
    );
    for (scenario, totals) in &stats.per_scenario {
        info!(
            %scenario,
            workers = totals.workers,
            attempted = totals.attempted,
            sent = totals.sent,
            errors = totals.errors,
            "scenario totals"
        );
    }
}

#[expect(clippy::print_stdout, reason = "listing is the command's output")]
fn print_catalog() {
    for descriptor in CATALOG {
        println!("{:<12} {}", descriptor.name, descriptor.expected_effect);
    }
}

#[cfg(test)]
mod tests;
