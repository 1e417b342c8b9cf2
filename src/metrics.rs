//! Per-worker progress counters and the run-wide aggregate.
//!
//! Each worker owns a [`WorkerProgress`] it updates with relaxed atomics. When
//! the worker returns, or when the orchestrator gives up on it, the progress
//! is turned into a [`WorkerResult`] and merged into the shared
//! [`MetricsAggregator`] exactly once.

use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        OnceLock,
        PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;

/// How a worker's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerOutcome {
    /// Every planned event was attempted.
    Completed,
    /// The session failed and the remaining events were counted as errors.
    TransportFailed,
    /// No session could be opened; every planned event is an error.
    ConnectFailed,
    /// Stopped at the run deadline, or never returned within the grace period.
    Abandoned,
}

/// Live counters for one worker.
#[derive(Debug, Default)]
pub struct WorkerProgress {
    attempted: AtomicU64,
    sent: AtomicU64,
    errors: AtomicU64,
    started: OnceLock<Instant>,
    merged: AtomicBool,
}

/// Point-in-time copy of a [`WorkerProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Events handed to the transport or written off.
    pub attempted: u64,
    /// Events whose bytes were submitted.
    pub sent: u64,
    /// Events that failed or were never sent after a failure.
    pub errors: u64,
    /// Time since [`WorkerProgress::start`].
    pub elapsed: Duration,
}

impl WorkerProgress {
    /// Record the start time; later calls keep the first value.
    pub fn start(&self) { self.started.get_or_init(Instant::now); }

    /// Count `n` attempted events.
    pub fn add_attempted(&self, n: u64) { self.attempted.fetch_add(n, Ordering::Relaxed); }

    /// Count `n` submitted events.
    pub fn add_sent(&self, n: u64) { self.sent.fetch_add(n, Ordering::Relaxed); }

    /// Count `n` failed events.
    pub fn add_errors(&self, n: u64) { self.errors.fetch_add(n, Ordering::Relaxed); }

    /// Events attempted so far.
    #[must_use]
    pub fn attempted(&self) -> u64 { self.attempted.load(Ordering::Relaxed) }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            attempted: self.attempted(),
            sent: self.sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed: self
                .started
                .get()
                .map(Instant::elapsed)
                .unwrap_or_default(),
        }
    }

    /// Claim the right to merge this worker. Only the first caller gets `true`.
    #[must_use]
    pub fn claim_merge(&self) -> bool { !self.merged.swap(true, Ordering::AcqRel) }
}

/// Final accounting for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResult {
    /// Worker index.
    pub worker_id: usize,
    /// Scenario the worker ran.
    pub scenario: String,
    /// Events attempted.
    pub attempted: u64,
    /// Events sent.
    pub sent: u64,
    /// Events failed.
    pub errors: u64,
    /// Wall-clock time the worker ran.
    pub elapsed: Duration,
    /// How the run ended.
    pub outcome: WorkerOutcome,
}

impl WorkerResult {
    /// Build a result from a progress snapshot.
    #[must_use]
    pub fn from_progress(
        worker_id: usize,
        scenario: impl Into<String>,
        progress: &WorkerProgress,
        outcome: WorkerOutcome,
    ) -> Self {
        let snap = progress.snapshot();
        Self {
            worker_id,
            scenario: scenario.into(),
            attempted: snap.attempted,
            sent: snap.sent,
            errors: snap.errors,
            elapsed: snap.elapsed,
            outcome,
        }
    }
}

/// Number of workers per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeCounts {
    /// [`WorkerOutcome::Completed`].
    pub completed: u64,
    /// [`WorkerOutcome::TransportFailed`].
    pub transport_failed: u64,
    /// [`WorkerOutcome::ConnectFailed`].
    pub connect_failed: u64,
    /// [`WorkerOutcome::Abandoned`].
    pub abandoned: u64,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: WorkerOutcome) {
        let slot = match outcome {
            WorkerOutcome::Completed => &mut self.completed,
            WorkerOutcome::TransportFailed => &mut self.transport_failed,
            WorkerOutcome::ConnectFailed => &mut self.connect_failed,
            WorkerOutcome::Abandoned => &mut self.abandoned,
        };
        *slot += 1;
    }
}

/// Totals for one scenario name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScenarioTotals {
    /// Workers that ran the scenario.
    pub workers: u64,
    /// Events attempted.
    pub attempted: u64,
    /// Events sent.
    pub sent: u64,
    /// Events failed.
    pub errors: u64,
}

/// Run-wide totals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateStats {
    /// Workers merged.
    pub workers: u64,
    /// Events attempted.
    pub attempted: u64,
    /// Events sent.
    pub sent: u64,
    /// Events failed.
    pub errors: u64,
    /// Run duration; the longest worker until the orchestrator sets the wall clock.
    pub elapsed: Duration,
    /// Workers per outcome.
    pub outcomes: OutcomeCounts,
    /// Totals keyed by scenario name.
    pub per_scenario: BTreeMap<String, ScenarioTotals>,
}

impl AggregateStats {
    fn absorb(&mut self, result: &WorkerResult) {
        self.workers += 1;
        self.attempted += result.attempted;
        self.sent += result.sent;
        self.errors += result.errors;
        self.elapsed = self.elapsed.max(result.elapsed);
        self.outcomes.record(result.outcome);
        let totals = self.per_scenario.entry(result.scenario.clone()).or_default();
        totals.workers += 1;
        totals.attempted += result.attempted;
        totals.sent += result.sent;
        totals.errors += result.errors;
    }

    /// Sent events per second, guarding against a zero duration.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "throughput is a reporting figure"
    )]
    pub fn throughput(&self) -> f64 {
        const EPSILON_SECS: f64 = 1e-9;
        self.sent as f64 / self.elapsed.as_secs_f64().max(EPSILON_SECS)
    }

    /// Whether no worker hit an unrecoverable connection failure, either at
    /// connect time or part-way through its sends.
    #[must_use]
    pub const fn connections_held(&self) -> bool {
        self.outcomes.connect_failed == 0 && self.outcomes.transport_failed == 0
    }
}

/// Lock-guarded accumulator shared by all workers of a run.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    inner: Mutex<AggregateStats>,
}

impl MetricsAggregator {
    /// Empty aggregator.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Fold one worker result in under a single lock acquisition.
    pub fn merge(&self, result: &WorkerResult) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .absorb(result);
    }

    /// Consistent copy of the totals.
    #[must_use]
    pub fn snapshot(&self) -> AggregateStats {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use rstest::rstest;

    use super::*;

    fn result(worker_id: usize, scenario: &str, sent: u64, errors: u64, outcome: WorkerOutcome) -> WorkerResult {
        WorkerResult {
            worker_id,
            scenario: scenario.to_owned(),
            attempted: sent + errors,
            sent,
            errors,
            elapsed: Duration::from_millis(10 * (worker_id as u64 + 1)),
            outcome,
        }
    }

    #[rstest]
    fn merge_sums_counts_and_outcomes() {
        let agg = MetricsAggregator::new();
        agg.merge(&result(0, "burst", 100, 0, WorkerOutcome::Completed));
        agg.merge(&result(1, "burst", 40, 60, WorkerOutcome::TransportFailed));
        agg.merge(&result(2, "chaos", 0, 50, WorkerOutcome::ConnectFailed));

        let stats = agg.snapshot();
        assert_eq!(stats.workers, 3);
        assert_eq!(stats.attempted, 250);
        assert_eq!(stats.sent, 140);
        assert_eq!(stats.errors, 110);
        assert_eq!(stats.elapsed, Duration::from_millis(30));
        assert_eq!(stats.outcomes.transport_failed, 1);
        assert!(!stats.connections_held());
        assert_eq!(stats.per_scenario["burst"].attempted, 200);
        assert_eq!(stats.per_scenario["chaos"].workers, 1);
    }

    #[rstest]
    fn concurrent_merges_are_consistent() {
        let agg = Arc::new(MetricsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|id| {
                let shared = Arc::clone(&agg);
                thread::spawn(move || {
                    shared.merge(&result(id, "burst", 10, 1, WorkerOutcome::Completed));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        let stats = agg.snapshot();
        assert_eq!(stats.attempted, stats.sent + stats.errors);
        assert_eq!(stats.sent, 80);
        assert_eq!(stats.outcomes.completed, 8);
    }

    #[rstest]
    fn throughput_guards_zero_elapsed() {
        let stats = AggregateStats {
            sent: 10,
            ..AggregateStats::default()
        };
        assert!(stats.throughput().is_finite());
        let timed = AggregateStats {
            sent: 500,
            elapsed: Duration::from_millis(250),
            ..AggregateStats::default()
        };
        assert!((timed.throughput() - 2000.0).abs() < 1e-6);
    }

    #[rstest]
    #[case(WorkerOutcome::Completed, true)]
    #[case(WorkerOutcome::Abandoned, true)]
    #[case(WorkerOutcome::TransportFailed, false)]
    #[case(WorkerOutcome::ConnectFailed, false)]
    fn connection_loss_by_outcome(#[case] outcome: WorkerOutcome, #[case] held: bool) {
        let agg = MetricsAggregator::new();
        agg.merge(&result(0, "burst", 1000, 0, WorkerOutcome::Completed));
        agg.merge(&result(1, "burst", 5, 995, outcome));
        assert_eq!(agg.snapshot().connections_held(), held);
    }

    #[rstest]
    fn merge_claim_is_exclusive() {
        let progress = WorkerProgress::default();
        assert!(progress.claim_merge());
        assert!(!progress.claim_merge());
    }

    #[rstest]
    fn progress_snapshot_tracks_counters() {
        let progress = WorkerProgress::default();
        progress.add_attempted(5);
        progress.add_sent(3);
        progress.add_errors(2);
        let snap = progress.snapshot();
        assert_eq!((snap.attempted, snap.sent, snap.errors), (5, 3, 2));
        assert_eq!(snap.elapsed, Duration::ZERO);
    }
}
