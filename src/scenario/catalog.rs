//! Built-in scenarios selectable by name.

use std::time::Duration;

use super::{FragmentMode, ScenarioSpec, Strategy, TransportChoice};
use crate::{event::Priority, payload::PayloadSizes, topics::TopicSet};

/// Run-wide knobs a descriptor turns into a [`ScenarioSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioParams {
    /// Events per worker.
    pub events: u64,
    /// Payload sizes to draw from.
    pub payload_sizes: PayloadSizes,
    /// Seed for random choices.
    pub seed: u64,
    /// Delay between writes.
    pub pace: Duration,
    /// Receiver queue capacity for the overflow scenario.
    pub overflow_capacity: u64,
    /// Fresh events between injected duplicates.
    pub duplicate_interval: u32,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            events: 1000,
            payload_sizes: PayloadSizes::default(),
            seed: 0,
            pace: Duration::ZERO,
            overflow_capacity: 16_384,
            duplicate_interval: 10,
        }
    }
}

/// A named scenario with the receiver-side effect it is meant to provoke.
///
/// The expected effect is documentation for whoever reads the receiver's
/// logs; the harness never checks it.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioDescriptor {
    /// Selection name.
    pub name: &'static str,
    /// Human-readable expected effect.
    pub expected_effect: &'static str,
    build: fn(&str, &ScenarioParams) -> ScenarioSpec,
}

impl ScenarioDescriptor {
    /// Instantiate the scenario. The id base is left at zero for the caller.
    #[must_use]
    pub fn build(&self, params: &ScenarioParams) -> ScenarioSpec { (self.build)(self.name, params) }
}

fn base(name: &str, params: &ScenarioParams, strategy: Strategy) -> ScenarioSpec {
    ScenarioSpec {
        name: name.to_owned(),
        strategy,
        transport: TransportChoice::Stream,
        count: params.events,
        payload_sizes: params.payload_sizes.clone(),
        topics: TopicSet::Load,
        seed: params.seed,
        pace: params.pace,
        id_base: 0,
    }
}

/// Whole passes over every pair: the event count is rounded up to a multiple
/// of the pair count.
fn sweep(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    let topics = TopicSet::All;
    let pairs = Strategy::sweep_pairs(topics);
    let passes = p.events.div_ceil(pairs);
    let repeats = u32::try_from(passes.max(1)).unwrap_or(u32::MAX);
    ScenarioSpec {
        topics,
        count: pairs.saturating_mul(passes.min(u64::from(repeats))),
        ..base(name, p, Strategy::Sweep { repeats })
    }
}

fn burst(name: &str, p: &ScenarioParams) -> ScenarioSpec { base(name, p, Strategy::Burst) }

fn duplicates(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    base(
        name,
        p,
        Strategy::Duplicates {
            interval: p.duplicate_interval,
        },
    )
}

fn fragmented(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    base(
        name,
        p,
        Strategy::Fragmented {
            frames_per_write: 2,
            mode: FragmentMode::Split,
        },
    )
}

fn sticky(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    base(
        name,
        p,
        Strategy::Fragmented {
            frames_per_write: 3,
            mode: FragmentMode::Sticky,
        },
    )
}

fn overflow(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    let capacity = p.overflow_capacity;
    let count = p
        .events
        .max(capacity.saturating_add(capacity >> 2).max(capacity.saturating_add(1)));
    ScenarioSpec {
        count,
        topics: TopicSet::Realtime,
        ..base(
            name,
            p,
            Strategy::Overflow {
                priority: Priority::High,
                capacity,
            },
        )
    }
}

fn chaos(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        topics: TopicSet::All,
        ..base(name, p, Strategy::Chaos)
    }
}

fn tiered(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        topics: TopicSet::All,
        ..base(name, p, Strategy::Tiered)
    }
}

fn reconnect(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        transport: TransportChoice::SupervisedStream,
        pace: p.pace.max(Duration::from_millis(10)),
        ..base(name, p, Strategy::Burst)
    }
}

fn udp_burst(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        transport: TransportChoice::Datagram,
        ..base(name, p, Strategy::Burst)
    }
}

fn udp_chaos(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        transport: TransportChoice::Datagram,
        topics: TopicSet::All,
        ..base(name, p, Strategy::Chaos)
    }
}

fn mixed(name: &str, p: &ScenarioParams) -> ScenarioSpec {
    ScenarioSpec {
        transport: TransportChoice::Mixed,
        ..base(name, p, Strategy::Burst)
    }
}

/// Every built-in scenario.
pub const CATALOG: &[ScenarioDescriptor] = &[
    ScenarioDescriptor {
        name: "sweep",
        expected_effect: "every priority/topic pair is accepted and routed to its tier queue",
        build: sweep,
    },
    ScenarioDescriptor {
        name: "burst",
        expected_effect: "sustained TCP throughput; no parse errors, queues drain",
        build: burst,
    },
    ScenarioDescriptor {
        name: "duplicates",
        expected_effect: "repeated event ids are detected or processed idempotently",
        build: duplicates,
    },
    ScenarioDescriptor {
        name: "fragmented",
        expected_effect: "frames split across writes are reassembled intact",
        build: fragmented,
    },
    ScenarioDescriptor {
        name: "sticky",
        expected_effect: "several frames in one write are all parsed",
        build: sticky,
    },
    ScenarioDescriptor {
        name: "overflow",
        expected_effect: "HIGH queue overflows; the receiver drops or applies backpressure",
        build: overflow,
    },
    ScenarioDescriptor {
        name: "chaos",
        expected_effect: "random tiers, topics and sizes are parsed without errors",
        build: chaos,
    },
    ScenarioDescriptor {
        name: "tiered",
        expected_effect: "realtime, transactional and batch topics land in their conventional tiers",
        build: tiered,
    },
    ScenarioDescriptor {
        name: "reconnect",
        expected_effect: "the harness reconnects after receiver restarts; gaps show as errors",
        build: reconnect,
    },
    ScenarioDescriptor {
        name: "udp-burst",
        expected_effect: "UDP frames are parsed one per datagram; losses are not reported",
        build: udp_burst,
    },
    ScenarioDescriptor {
        name: "udp-chaos",
        expected_effect: "random UDP traffic is parsed; oversize datagrams are rejected locally",
        build: udp_chaos,
    },
    ScenarioDescriptor {
        name: "mixed",
        expected_effect: "TCP and UDP ingress interleave without cross-talk",
        build: mixed,
    },
];

/// Look up a descriptor by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static ScenarioDescriptor> {
    CATALOG.iter().find(|d| d.name == name)
}
