//! Topic families and the harness-side topic/priority convention.
//!
//! The receiver does not derive priority from the topic; these tables only
//! decide which tier the harness attaches to each topic in tier-aware
//! scenarios.

use crate::event::Priority;

/// Generic load-test topics used by the burst and chaos scenarios.
pub const LOAD_TOPICS: &[&str] = &[
    "orders.create",
    "orders.update",
    "payments.process",
    "inventory.update",
    "users.login",
    "alerts.cpu",
    "analytics.pageview",
    "logs.app",
    "system.health",
    "events.business",
    "metrics.latency",
    "traces.span",
];

/// Latency-sensitive topics and their tiers.
pub const REALTIME_TOPICS: &[(&str, Priority)] = &[
    ("system/alerts", Priority::High),
    ("system/errors", Priority::Critical),
    ("security/breach", Priority::Critical),
    ("payment/fraud_detected", Priority::Critical),
    ("user/login", Priority::High),
    ("user/logout", Priority::High),
    ("payment/processed", Priority::High),
    ("sensor/temperature_critical", Priority::Critical),
];

/// Transactional topics and their tiers.
pub const TRANSACTIONAL_TOPICS: &[(&str, Priority)] = &[
    ("database/write", Priority::Medium),
    ("database/read", Priority::Medium),
    ("order/created", Priority::Medium),
    ("order/updated", Priority::Medium),
    ("user/profile_update", Priority::Low),
    ("user/preferences", Priority::Low),
    ("analytics/event", Priority::Low),
    ("logs/audit", Priority::Low),
];

/// Bulk topics, always sent at [`Priority::Batch`].
pub const BATCH_TOPICS: &[&str] = &[
    "analytics/metrics",
    "analytics/aggregation",
    "batch/events",
    "batch/aggregation",
    "reporting/daily",
];

/// Conventional tier for a known topic, if any.
#[must_use]
pub fn priority_for_topic(topic: &str) -> Option<Priority> {
    REALTIME_TOPICS
        .iter()
        .chain(TRANSACTIONAL_TOPICS)
        .find_map(|(name, priority)| (*name == topic).then_some(*priority))
        .or_else(|| BATCH_TOPICS.contains(&topic).then_some(Priority::Batch))
}

/// Named topic family a scenario draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicSet {
    /// [`LOAD_TOPICS`].
    #[default]
    Load,
    /// [`REALTIME_TOPICS`].
    Realtime,
    /// [`TRANSACTIONAL_TOPICS`].
    Transactional,
    /// [`BATCH_TOPICS`].
    Batch,
    /// Realtime, transactional and batch topics together.
    All,
}

impl TopicSet {
    /// Topics in this family, in table order.
    #[must_use]
    pub fn topics(self) -> Vec<&'static str> {
        let tiered = |table: &[(&'static str, Priority)]| {
            table.iter().map(|(name, _)| *name).collect::<Vec<_>>()
        };
        match self {
            Self::Load => LOAD_TOPICS.to_vec(),
            Self::Realtime => tiered(REALTIME_TOPICS),
            Self::Transactional => tiered(TRANSACTIONAL_TOPICS),
            Self::Batch => BATCH_TOPICS.to_vec(),
            Self::All => {
                let mut all = tiered(REALTIME_TOPICS);
                all.extend(tiered(TRANSACTIONAL_TOPICS));
                all.extend_from_slice(BATCH_TOPICS);
                all
            }
        }
    }
}
