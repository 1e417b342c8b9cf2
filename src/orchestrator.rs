//! Bounded pool of concurrent scenario workers.
//!
//! [`LoadOrchestrator::run`] spawns one Tokio task per [`WorkerJob`] onto a
//! [`JoinSet`]; a semaphore keeps at most `pool_size` of them active. Each
//! worker opens its own session, runs its scenario and merges its
//! [`WorkerResult`] into the shared [`MetricsAggregator`].
//!
//! When the run deadline passes the stop signal is raised. Workers notice it
//! between writes. Any worker still running after the grace period is
//! detached and its progress snapshot merged as
//! [`WorkerOutcome::Abandoned`].

#![expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! macro usage"
)]

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use thiserror::Error;
use tokio::{
    sync::Semaphore,
    task::JoinSet,
    time::{Instant, sleep, timeout},
};
use tracing::{debug, error, info, warn};

use crate::{
    frame::EncodingError,
    metrics::{AggregateStats, MetricsAggregator, WorkerOutcome, WorkerProgress, WorkerResult},
    scenario::{RunnerOutcome, ScenarioError, ScenarioSpec, TransportChoice, run_scenario},
    stop::{self, StopSignal},
    supervisor::{BackoffPolicy, ConnectionSupervisor, TcpConnector},
    transport::{
        CONNECT_TIMEOUT,
        DatagramSession,
        FrameSink,
        IO_TIMEOUT,
        MixedSession,
        StreamSession,
        TransportError,
    },
};

/// Default run deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);
/// Default wait for workers after the stop signal.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Where and how workers connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Receiver TCP address.
    pub tcp: SocketAddr,
    /// Receiver UDP address.
    pub udp: SocketAddr,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Per-write timeout.
    pub io_timeout: Duration,
    /// Reconnect policy for supervised streams.
    pub backoff: BackoffPolicy,
}

impl Target {
    /// Target with default timeouts and backoff.
    #[must_use]
    pub fn new(tcp: SocketAddr, udp: SocketAddr) -> Self {
        Self {
            tcp,
            udp,
            connect_timeout: CONNECT_TIMEOUT,
            io_timeout: IO_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// One worker's assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerJob {
    /// Worker index, also used in logs.
    pub worker_id: usize,
    /// Scenario to run.
    pub spec: ScenarioSpec,
    /// Receiver endpoints.
    pub target: Target,
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A job's scenario is invalid; nothing was started.
    #[error("worker {worker_id}: {source}")]
    InvalidScenario {
        /// Offending worker.
        worker_id: usize,
        /// Validation failure.
        #[source]
        source: ScenarioError,
    },
    /// A worker could not encode an event; all workers were stopped.
    #[error("worker {worker_id} ({scenario}): encoding failed: {source}")]
    Encoding {
        /// Offending worker.
        worker_id: usize,
        /// Scenario name.
        scenario: String,
        /// Encoding failure.
        #[source]
        source: EncodingError,
    },
}

struct WorkerSlot {
    worker_id: usize,
    scenario: String,
    progress: Arc<WorkerProgress>,
}

struct WorkerContext {
    metrics: Arc<MetricsAggregator>,
    permits: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    progress: Arc<WorkerProgress>,
    stop: StopSignal,
}

/// Runs jobs on a bounded worker pool.
#[derive(Debug)]
pub struct LoadOrchestrator {
    metrics: Arc<MetricsAggregator>,
    deadline: Duration,
    grace: Duration,
    peak: Arc<AtomicUsize>,
}

impl LoadOrchestrator {
    /// Orchestrator merging into `metrics`.
    #[must_use]
    pub fn new(metrics: Arc<MetricsAggregator>) -> Self {
        Self {
            metrics,
            deadline: DEFAULT_DEADLINE,
            grace: DEFAULT_GRACE,
            peak: Arc::default(),
        }
    }

    /// Override the run deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Override the grace period after the stop signal.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Most workers observed running at once during the last run.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize { self.peak.load(Ordering::Relaxed) }

    /// Run every job, at most `pool_size` at a time, and return the totals.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::InvalidScenario`] before starting anything
    /// if a job is invalid, or [`OrchestratorError::Encoding`] after stopping
    /// all workers if one of them hit an encoding error.
    pub async fn run(
        &self,
        pool_size: NonZeroUsize,
        jobs: Vec<WorkerJob>,
    ) -> Result<AggregateStats, OrchestratorError> {
        for job in &jobs {
            job.spec
                .validate()
                .map_err(|source| OrchestratorError::InvalidScenario {
                    worker_id: job.worker_id,
                    source,
                })?;
        }

        let started = Instant::now();
        let (stop_handle, stop_signal) = stop::channel();
        let permits = Arc::new(Semaphore::new(pool_size.get()));
        let active = Arc::new(AtomicUsize::new(0));
        self.peak.store(0, Ordering::Relaxed);
        let mut slots = Vec::with_capacity(jobs.len());
        let mut join_set = JoinSet::new();

        info!(workers = jobs.len(), pool_size = pool_size.get(), "starting workers");
        for job in jobs {
            let progress = Arc::new(WorkerProgress::default());
            slots.push(WorkerSlot {
                worker_id: job.worker_id,
                scenario: job.spec.name.clone(),
                progress: Arc::clone(&progress),
            });
            let ctx = WorkerContext {
                metrics: Arc::clone(&self.metrics),
                permits: Arc::clone(&permits),
                active: Arc::clone(&active),
                peak: Arc::clone(&self.peak),
                progress,
                stop: stop_signal.clone(),
            };
            join_set.spawn(run_worker(job, ctx));
        }

        let mut failure = None;
        let deadline = sleep(self.deadline);
        tokio::pin!(deadline);
        let mut stopping = false;
        loop {
            tokio::select! {
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { break };
                    if let Some(err) = handle_join(joined) {
                        stop_handle.raise();
                        stopping = true;
                        failure = Some(err);
                        break;
                    }
                }
                () = &mut deadline, if !stopping => {
                    warn!(deadline = ?self.deadline, "run deadline reached; stopping workers");
                    stop_handle.raise();
                    stopping = true;
                    break;
                }
            }
        }

        if stopping && !join_set.is_empty() {
            let drain = async {
                while let Some(joined) = join_set.join_next().await {
                    if let Some(err) = handle_join(joined) {
                        failure.get_or_insert(err);
                    }
                }
            };
            if timeout(self.grace, drain).await.is_err() {
                warn!(
                    remaining = join_set.len(),
                    grace = ?self.grace,
                    "workers did not stop in time; abandoning them"
                );
                join_set.detach_all();
            }
        }

        for slot in &slots {
            if slot.progress.claim_merge() {
                debug!(worker_id = slot.worker_id, "merging abandoned worker");
                self.metrics.merge(&WorkerResult::from_progress(
                    slot.worker_id,
                    slot.scenario.as_str(),
                    &slot.progress,
                    WorkerOutcome::Abandoned,
                ));
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        let mut stats = self.metrics.snapshot();
        stats.elapsed = started.elapsed();
        Ok(stats)
    }
}

fn handle_join(
    joined: Result<Result<(), OrchestratorError>, tokio::task::JoinError>,
) -> Option<OrchestratorError> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(err)) => {
            error!(error = %err, "worker aborted");
            Some(err)
        }
        Err(err) => {
            error!(error = %err, "worker task failed");
            None
        }
    }
}

async fn open_sink(
    spec: &ScenarioSpec,
    target: &Target,
    stop: &StopSignal,
) -> Result<Box<dyn FrameSink>, TransportError> {
    let sink: Box<dyn FrameSink> = match spec.transport {
        TransportChoice::Stream => Box::new(
            StreamSession::connect(target.tcp, target.connect_timeout)
                .await?
                .with_timeout(target.io_timeout),
        ),
        TransportChoice::SupervisedStream => {
            let connector = TcpConnector::new(target.tcp)
                .with_timeouts(target.connect_timeout, target.io_timeout);
            Box::new(ConnectionSupervisor::new(connector, target.backoff).with_stop(stop.clone()))
        }
        TransportChoice::Datagram => Box::new(DatagramSession::bind(target.udp).await?),
        TransportChoice::Mixed => {
            let stream = StreamSession::connect(target.tcp, target.connect_timeout)
                .await?
                .with_timeout(target.io_timeout);
            let datagram = DatagramSession::bind(target.udp).await?;
            Box::new(MixedSession::new(stream, datagram))
        }
    };
    Ok(sink)
}

fn finish(job: &WorkerJob, ctx: &WorkerContext, outcome: WorkerOutcome) {
    if !ctx.progress.claim_merge() {
        return;
    }
    let result = WorkerResult::from_progress(job.worker_id, job.spec.name.as_str(), &ctx.progress, outcome);
    info!(
        worker_id = result.worker_id,
        scenario = %result.scenario,
        attempted = result.attempted,
        sent = result.sent,
        errors = result.errors,
        outcome = ?result.outcome,
        "worker finished"
    );
    ctx.metrics.merge(&result);
}

async fn run_worker(job: WorkerJob, ctx: WorkerContext) -> Result<(), OrchestratorError> {
    let Ok(permit) = Arc::clone(&ctx.permits).acquire_owned().await else {
        return Ok(());
    };
    if ctx.stop.is_raised() {
        finish(&job, &ctx, WorkerOutcome::Abandoned);
        return Ok(());
    }
    let running = ctx.active.fetch_add(1, Ordering::AcqRel) + 1;
    ctx.peak.fetch_max(running, Ordering::AcqRel);
    let result = drive(&job, &ctx).await;
    ctx.active.fetch_sub(1, Ordering::AcqRel);
    drop(permit);
    result
}

async fn drive(job: &WorkerJob, ctx: &WorkerContext) -> Result<(), OrchestratorError> {
    let spec = &job.spec;
    ctx.progress.start();
    let mut sink = match open_sink(spec, &job.target, &ctx.stop).await {
        Ok(sink) => sink,
        Err(err) => {
            warn!(
                worker_id = job.worker_id,
                scenario = %spec.name,
                error = %err,
                "could not open session; counting all events as errors"
            );
            ctx.progress.add_attempted(spec.count);
            ctx.progress.add_errors(spec.count);
            finish(job, ctx, WorkerOutcome::ConnectFailed);
            return Ok(());
        }
    };
    debug!(worker_id = job.worker_id, scenario = %spec.name, kind = ?sink.kind(), "session open");

    match run_scenario(sink.as_mut(), spec, &ctx.progress, ctx.stop.clone()).await {
        Ok(RunnerOutcome::Completed) => finish(job, ctx, WorkerOutcome::Completed),
        Ok(RunnerOutcome::TransportFailed) => finish(job, ctx, WorkerOutcome::TransportFailed),
        Ok(RunnerOutcome::Stopped) => finish(job, ctx, WorkerOutcome::Abandoned),
        Err(source) => {
            return Err(OrchestratorError::Encoding {
                worker_id: job.worker_id,
                scenario: spec.name.clone(),
                source,
            });
        }
    }
    Ok(())
}
