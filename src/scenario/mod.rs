//! Parameterised traffic scenarios.
//!
//! A [`ScenarioSpec`] pairs a [`Strategy`] with the knobs every strategy
//! shares: event count, payload sizes, topic family, seed, pacing and the id
//! base of the worker running it. [`plan::ScenarioPlan`] expands a spec into
//! writes, [`runner::run_scenario`] drives those writes into a sink, and
//! [`catalog`] names the built-in specs.

use std::time::Duration;

use thiserror::Error;

use crate::{event::Priority, payload::PayloadSizes, topics::TopicSet};

pub mod catalog;
pub mod plan;
pub mod runner;

pub use catalog::{CATALOG, ScenarioDescriptor, ScenarioParams, find};
pub use plan::{ScenarioPlan, Step, WriteShape};
pub use runner::{RunnerOutcome, run_scenario};

/// How fragmented writes are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentMode {
    /// Concatenate frames and cut the buffer in two writes at a random point.
    Split,
    /// Concatenate frames into a single write.
    Sticky,
}

/// Traffic pattern of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every (priority, topic) pair in turn, each `repeats` times, ids ascending.
    Sweep {
        /// Consecutive events per pair.
        repeats: u32,
    },
    /// As fast as possible, priority `id % 5`, topic `id % topics`.
    Burst,
    /// Burst, re-sending the first event of every `interval` fresh events.
    Duplicates {
        /// Fresh events between two duplicates.
        interval: u32,
    },
    /// Several frames per write; stream transports only.
    Fragmented {
        /// Frames concatenated per write (at least two).
        frames_per_write: usize,
        /// Split or sticky.
        mode: FragmentMode,
    },
    /// More same-priority events than the receiver queue holds.
    Overflow {
        /// Tier of every event.
        priority: Priority,
        /// Receiver capacity the count must exceed.
        capacity: u64,
    },
    /// Uniformly random priority, topic and payload size per event.
    Chaos,
    /// Topics in turn, each with its conventional tier.
    Tiered,
}

impl Strategy {
    /// Number of (priority, topic) pairs a sweep over `topics` visits.
    #[must_use]
    pub fn sweep_pairs(topics: TopicSet) -> u64 {
        Priority::ALL.len() as u64 * (topics.topics().len() as u64).max(1)
    }
}

/// Transport a scenario runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportChoice {
    /// One TCP connection; the first failure ends the run.
    Stream,
    /// TCP behind a reconnecting supervisor.
    SupervisedStream,
    /// One UDP datagram per frame.
    Datagram,
    /// TCP and UDP alternately.
    Mixed,
}

impl TransportChoice {
    /// Whether frames travel on an ordered byte stream only.
    #[must_use]
    pub const fn is_stream(self) -> bool { matches!(self, Self::Stream | Self::SupervisedStream) }
}

/// Invalid scenario parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    /// Fragmented writes need a byte stream.
    #[error("scenario {0:?}: fragmented writes require a stream transport")]
    FragmentationNeedsStream(String),
    /// Fewer than two frames per fragmented write.
    #[error("scenario {name:?}: frames per write must be at least 2, got {frames}")]
    TooFewFramesPerWrite {
        /// Scenario name.
        name: String,
        /// Configured frames per write.
        frames: usize,
    },
    /// Overflow scenario that would not exceed the capacity.
    #[error("scenario {name:?}: overflow count {count} does not exceed capacity {capacity}")]
    OverflowBelowCapacity {
        /// Scenario name.
        name: String,
        /// Planned events.
        count: u64,
        /// Receiver capacity.
        capacity: u64,
    },
    /// A sweep whose count stops part-way through a pass.
    #[error("scenario {name:?}: sweep count {count} is not a multiple of {pass} events per pass")]
    PartialSweep {
        /// Scenario name.
        name: String,
        /// Planned events.
        count: u64,
        /// Events in one full pass (pairs times repeats).
        pass: u64,
    },
    /// A fragmented scenario with a single event cannot fill a multi-frame write.
    #[error("scenario {0:?}: fragmented writes need at least 2 events")]
    SingleFragment(String),
    /// A zero repeat count or duplicate interval.
    #[error("scenario {0:?}: repeats and intervals must be positive")]
    ZeroPeriod(String),
}

/// One fully parameterised scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSpec {
    /// Catalogue name, used in logs and per-scenario totals.
    pub name: String,
    /// Traffic pattern.
    pub strategy: Strategy,
    /// Transport to open.
    pub transport: TransportChoice,
    /// Events to plan, duplicates included.
    pub count: u64,
    /// Payload sizes to draw from.
    pub payload_sizes: PayloadSizes,
    /// Topic family.
    pub topics: TopicSet,
    /// Seed for random choices.
    pub seed: u64,
    /// Delay between writes.
    pub pace: Duration,
    /// First event id; fresh events count up from here.
    pub id_base: u64,
}

impl ScenarioSpec {
    /// Check strategy and transport constraints.
    ///
    /// # Errors
    /// Returns [`ScenarioError`] when the combination cannot run.
    #[expect(clippy::integer_division_remainder_used, reason = "whole-pass check")]
    pub fn validate(&self) -> Result<(), ScenarioError> {
        match self.strategy {
            Strategy::Fragmented { frames_per_write, .. } => {
                if !self.transport.is_stream() {
                    return Err(ScenarioError::FragmentationNeedsStream(self.name.clone()));
                }
                if frames_per_write < 2 {
                    return Err(ScenarioError::TooFewFramesPerWrite {
                        name: self.name.clone(),
                        frames: frames_per_write,
                    });
                }
                if self.count == 1 {
                    return Err(ScenarioError::SingleFragment(self.name.clone()));
                }
            }
            Strategy::Overflow { capacity, .. } if self.count <= capacity => {
                return Err(ScenarioError::OverflowBelowCapacity {
                    name: self.name.clone(),
                    count: self.count,
                    capacity,
                });
            }
            Strategy::Sweep { repeats: 0 } | Strategy::Duplicates { interval: 0 } => {
                return Err(ScenarioError::ZeroPeriod(self.name.clone()));
            }
            Strategy::Sweep { repeats } => {
                let pass = Strategy::sweep_pairs(self.topics).saturating_mul(u64::from(repeats));
                if self.count % pass != 0 {
                    return Err(ScenarioError::PartialSweep {
                        name: self.name.clone(),
                        count: self.count,
                        pass,
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn spec() -> ScenarioSpec {
        ScenarioSpec {
            name: "test".to_owned(),
            strategy: Strategy::Burst,
            transport: TransportChoice::Stream,
            count: 100,
            payload_sizes: PayloadSizes::default(),
            topics: TopicSet::Load,
            seed: 1,
            pace: Duration::ZERO,
            id_base: 0,
        }
    }

    #[rstest]
    fn burst_is_valid(spec: ScenarioSpec) {
        assert_eq!(spec.validate(), Ok(()));
    }

    #[rstest]
    #[case(TransportChoice::Datagram)]
    #[case(TransportChoice::Mixed)]
    fn fragmentation_rejects_datagrams(mut spec: ScenarioSpec, #[case] transport: TransportChoice) {
        spec.strategy = Strategy::Fragmented {
            frames_per_write: 3,
            mode: FragmentMode::Split,
        };
        spec.transport = transport;
        assert_eq!(
            spec.validate(),
            Err(ScenarioError::FragmentationNeedsStream("test".to_owned()))
        );
    }

    #[rstest]
    fn fragmentation_needs_two_frames(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Fragmented {
            frames_per_write: 1,
            mode: FragmentMode::Sticky,
        };
        assert!(matches!(
            spec.validate(),
            Err(ScenarioError::TooFewFramesPerWrite { frames: 1, .. })
        ));
    }

    #[rstest]
    #[case(100, false)]
    #[case(101, true)]
    fn overflow_must_exceed_capacity(mut spec: ScenarioSpec, #[case] count: u64, #[case] ok: bool) {
        spec.strategy = Strategy::Overflow {
            priority: Priority::High,
            capacity: 100,
        };
        spec.count = count;
        assert_eq!(spec.validate().is_ok(), ok);
    }

    #[rstest]
    #[case(50, true)]
    #[case(100, true)]
    #[case(60, false)]
    fn sweep_stops_on_whole_passes(mut spec: ScenarioSpec, #[case] count: u64, #[case] ok: bool) {
        spec.strategy = Strategy::Sweep { repeats: 2 };
        spec.topics = TopicSet::Batch;
        spec.count = count;
        assert_eq!(spec.validate().is_ok(), ok);
    }

    #[rstest]
    fn single_fragment_rejected(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Fragmented {
            frames_per_write: 2,
            mode: FragmentMode::Sticky,
        };
        spec.count = 1;
        assert_eq!(
            spec.validate(),
            Err(ScenarioError::SingleFragment("test".to_owned()))
        );
    }

    #[rstest]
    fn zero_interval_rejected(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Duplicates { interval: 0 };
        assert_eq!(
            spec.validate(),
            Err(ScenarioError::ZeroPeriod("test".to_owned()))
        );
    }
}
