//! Lazy expansion of a [`ScenarioSpec`] into writes.
//!
//! Events are built immediately before they are needed. The only history
//! kept is the first event of the current duplicate window.

#![expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "rotations over fixed topic and tier tables"
)]

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{FragmentMode, ScenarioSpec, Strategy};
use crate::{
    event::{Event, EventId, Priority},
    payload::{PayloadSizes, build_payload, now_millis},
    topics::priority_for_topic,
};

/// How the bytes of one [`Step`] are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteShape {
    /// Each frame in its own write (steps hold exactly one event).
    PerFrame,
    /// All frames concatenated into one write.
    Sticky,
    /// All frames concatenated, written in two parts cut at `cut`.
    Split {
        /// Offset of the cut, strictly inside the concatenated buffer.
        cut: usize,
    },
}

/// Events to encode together and how to write them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Events in wire order.
    pub events: Vec<Event>,
    /// Write shape.
    pub shape: WriteShape,
}

impl Step {
    /// Combined encoded length of all events.
    #[must_use]
    pub fn encoded_len(&self) -> usize { self.events.iter().map(Event::encoded_len).sum() }
}

/// Iterator over the writes of one scenario.
pub struct ScenarioPlan {
    strategy: Strategy,
    count: u64,
    id_base: u64,
    sizes: PayloadSizes,
    topics: Vec<&'static str>,
    rng: StdRng,
    clock: fn() -> i64,
    emitted: u64,
    fresh: u64,
    window_len: u64,
    window_first: Option<Event>,
}

impl ScenarioPlan {
    /// Plan `spec` using the wall clock for payload timestamps.
    #[must_use]
    pub fn new(spec: &ScenarioSpec) -> Self {
        Self {
            strategy: spec.strategy,
            count: spec.count,
            id_base: spec.id_base,
            sizes: spec.payload_sizes.clone(),
            topics: spec.topics.topics(),
            rng: StdRng::seed_from_u64(spec.seed),
            clock: now_millis,
            emitted: 0,
            fresh: 0,
            window_len: 0,
            window_first: None,
        }
    }

    /// Replace the payload timestamp source.
    #[must_use]
    pub const fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Events not yet handed out.
    #[must_use]
    pub const fn remaining(&self) -> u64 { self.count.saturating_sub(self.emitted) }

    fn topic_at(&self, index: u64) -> &'static str {
        let len = self.topics.len() as u64;
        if len == 0 {
            return "";
        }
        usize::try_from(index % len)
            .ok()
            .and_then(|i| self.topics.get(i).copied())
            .unwrap_or_default()
    }

    fn fresh_event(&mut self) -> Event {
        let index = self.fresh;
        self.fresh += 1;
        let id = EventId::new(self.id_base.saturating_add(index));
        let topic_count = self.topics.len() as u64;
        let (priority, topic, size) = match self.strategy {
            Strategy::Sweep { repeats } => {
                let combos = 5 * topic_count.max(1);
                let combo = (index / u64::from(repeats.max(1))) % combos;
                let tier = Priority::rotating(combo / topic_count.max(1));
                (tier, self.topic_at(combo), self.sizes.cycle(index))
            }
            Strategy::Burst | Strategy::Duplicates { .. } | Strategy::Fragmented { .. } => (
                Priority::rotating(id.as_u64()),
                self.topic_at(id.as_u64()),
                self.sizes.cycle(index),
            ),
            Strategy::Overflow { priority, .. } => {
                (priority, self.topic_at(index), self.sizes.cycle(index))
            }
            Strategy::Chaos => {
                let tier = Priority::ALL
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(Priority::Medium);
                let topic = self.topics.choose(&mut self.rng).copied().unwrap_or_default();
                (tier, topic, self.sizes.pick(&mut self.rng))
            }
            Strategy::Tiered => {
                let topic = self.topic_at(index);
                let tier = priority_for_topic(topic).unwrap_or_else(|| Priority::rotating(index));
                (tier, topic, self.sizes.cycle(index))
            }
        };
        let payload = build_payload(id, priority, size, (self.clock)());
        Event::new(id, priority, topic, payload)
    }

    fn next_event(&mut self) -> Option<Event> {
        if self.emitted >= self.count {
            return None;
        }
        self.emitted += 1;
        let Strategy::Duplicates { interval } = self.strategy else {
            return Some(self.fresh_event());
        };
        if self.window_len >= u64::from(interval.max(1)) {
            self.window_len = 0;
            if let Some(first) = self.window_first.take() {
                return Some(first);
            }
        }
        let event = self.fresh_event();
        if self.window_len == 0 {
            self.window_first = Some(event.clone());
        }
        self.window_len += 1;
        Some(event)
    }
}

impl Iterator for ScenarioPlan {
    type Item = Step;

    fn next(&mut self) -> Option<Self::Item> {
        let Strategy::Fragmented {
            frames_per_write,
            mode,
        } = self.strategy
        else {
            return self.next_event().map(|event| Step {
                events: vec![event],
                shape: WriteShape::PerFrame,
            });
        };
        // A lone trailing event rides along with the last full write.
        let mut take = frames_per_write.max(1);
        if self.remaining() == take as u64 + 1 {
            take += 1;
        }
        let events: Vec<Event> = std::iter::from_fn(|| self.next_event()).take(take).collect();
        if events.is_empty() {
            return None;
        }
        let total: usize = events.iter().map(Event::encoded_len).sum();
        let shape = match mode {
            FragmentMode::Sticky => WriteShape::Sticky,
            FragmentMode::Split => WriteShape::Split {
                cut: self.rng.gen_range(1..total),
            },
        };
        Some(Step { events, shape })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        time::Duration,
    };

    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        scenario::TransportChoice,
        topics::{LOAD_TOPICS, TopicSet},
    };

    const fn fixed_clock() -> i64 { 1_700_000_000_000 }

    #[fixture]
    fn spec() -> ScenarioSpec {
        ScenarioSpec {
            name: "plan".to_owned(),
            strategy: Strategy::Burst,
            transport: TransportChoice::Stream,
            count: 25,
            payload_sizes: PayloadSizes::single(64),
            topics: TopicSet::Load,
            seed: 42,
            pace: Duration::ZERO,
            id_base: 30_000,
        }
    }

    fn events(spec: &ScenarioSpec) -> Vec<Event> {
        ScenarioPlan::new(spec)
            .with_clock(fixed_clock)
            .flat_map(|step| step.events)
            .collect()
    }

    #[rstest]
    fn burst_rotates_priority_and_topic(spec: ScenarioSpec) {
        let planned = events(&spec);
        assert_eq!(planned.len(), 25);
        for (offset, event) in (0_u64..).zip(&planned) {
            let id = 30_000 + offset;
            assert_eq!(event.id, EventId::new(id));
            assert_eq!(event.priority, Priority::rotating(id));
            assert_eq!(event.topic, LOAD_TOPICS[(id % 12) as usize]);
            assert_eq!(event.payload.len(), 64);
        }
    }

    #[rstest]
    fn sweep_covers_every_pair(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Sweep { repeats: 2 };
        spec.topics = TopicSet::Batch;
        spec.count = 50;
        let planned = events(&spec);
        let pairs: HashSet<_> = planned
            .iter()
            .map(|e| (e.priority, e.topic.clone()))
            .collect();
        assert_eq!(pairs.len(), 25);
        assert_eq!(planned[0].topic, planned[1].topic);
        assert!(planned.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[rstest]
    #[case(FragmentMode::Sticky, 9, vec![3, 3, 3])]
    #[case(FragmentMode::Sticky, 11, vec![3, 3, 3, 2])]
    #[case(FragmentMode::Split, 7, vec![3, 4])]
    fn fragmented_steps_never_hold_one_frame(
        mut spec: ScenarioSpec,
        #[case] mode: FragmentMode,
        #[case] count: u64,
        #[case] sizes: Vec<usize>,
    ) {
        spec.strategy = Strategy::Fragmented {
            frames_per_write: 3,
            mode,
        };
        spec.count = count;
        let steps: Vec<Step> = ScenarioPlan::new(&spec).with_clock(fixed_clock).collect();
        assert_eq!(steps.iter().map(|s| s.events.len()).collect::<Vec<_>>(), sizes);
    }

    #[rstest]
    fn sweep_visits_every_pair_equally(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Sweep { repeats: 3 };
        spec.topics = TopicSet::All;
        spec.count = Strategy::sweep_pairs(TopicSet::All) * 3;
        let mut per_pair: HashMap<(Priority, String), usize> = HashMap::new();
        for event in events(&spec) {
            *per_pair.entry((event.priority, event.topic.clone())).or_default() += 1;
        }
        assert_eq!(per_pair.len(), 105);
        assert!(per_pair.values().all(|&n| n == 3));
    }

    #[rstest]
    fn duplicates_resend_window_head(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Duplicates { interval: 3 };
        spec.count = 9;
        let planned = events(&spec);
        let ids: Vec<u64> = planned.iter().map(|e| e.id.as_u64() - 30_000).collect();
        assert_eq!(ids, [0, 1, 2, 0, 3, 4, 5, 3, 6]);
        assert_eq!(planned[3], planned[0]);
        assert_eq!(
            planned[3].encode().expect("encode"),
            planned[0].encode().expect("encode")
        );
    }

    #[rstest]
    fn split_cut_lies_inside_buffer(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Fragmented {
            frames_per_write: 3,
            mode: FragmentMode::Split,
        };
        spec.count = 10;
        let steps: Vec<Step> = ScenarioPlan::new(&spec).with_clock(fixed_clock).collect();
        assert_eq!(
            steps.iter().map(|s| s.events.len()).collect::<Vec<_>>(),
            [3, 3, 4]
        );
        for step in &steps {
            let WriteShape::Split { cut } = step.shape else {
                panic!("expected split shape");
            };
            assert!(cut > 0 && cut < step.encoded_len());
        }
    }

    #[rstest]
    fn chaos_is_reproducible(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Chaos;
        spec.payload_sizes = PayloadSizes::new(vec![64, 256, 1024]).expect("sizes");
        assert_eq!(events(&spec), events(&spec));
        spec.seed = 43;
        let other = events(&spec);
        spec.seed = 42;
        assert_ne!(events(&spec), other);
    }

    #[rstest]
    fn tiered_uses_topic_convention(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Tiered;
        spec.topics = TopicSet::Realtime;
        for event in events(&spec) {
            assert_eq!(priority_for_topic(&event.topic), Some(event.priority));
        }
    }

    #[rstest]
    fn overflow_keeps_single_tier(mut spec: ScenarioSpec) {
        spec.strategy = Strategy::Overflow {
            priority: Priority::High,
            capacity: 10,
        };
        assert!(events(&spec).iter().all(|e| e.priority == Priority::High));
    }
}
