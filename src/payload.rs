//! Deterministic JSON payload bodies of an exact byte size.
//!
//! Bodies look like `{"id":17,"ts":1700000000000,"priority":"HIGH","data":"xxxx"}`.
//! The `data` field is padded with `x` until the serialised object reaches the
//! requested size; when even the empty object is longer, the bytes are
//! truncated, which deliberately yields invalid JSON for very small sizes.

use std::str::FromStr;

use bytes::Bytes;
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use thiserror::Error;

use crate::event::{EventId, Priority};

/// Payload sizes used when none are configured.
pub const DEFAULT_PAYLOAD_SIZE: usize = 256;

/// Errors raised while parsing a payload size list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadSizeError {
    /// The list contained no sizes.
    #[error("payload size list is empty")]
    Empty,
    /// An entry was not a non-negative integer.
    #[error("invalid payload size {0:?}")]
    Invalid(String),
}

/// Non-empty set of payload sizes a scenario draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSizes(Vec<usize>);

impl PayloadSizes {
    /// Build a size set.
    ///
    /// # Errors
    /// Returns [`PayloadSizeError::Empty`] when `sizes` is empty.
    pub fn new(sizes: Vec<usize>) -> Result<Self, PayloadSizeError> {
        if sizes.is_empty() {
            return Err(PayloadSizeError::Empty);
        }
        Ok(Self(sizes))
    }

    /// A set containing one size.
    #[must_use]
    pub fn single(size: usize) -> Self { Self(vec![size]) }

    /// Sizes in configuration order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] { &self.0 }

    /// Largest configured size.
    #[must_use]
    pub fn max(&self) -> usize { self.0.iter().copied().max().unwrap_or_default() }

    /// Size for the `index`-th event when cycling through the set.
    #[must_use]
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "cycling over a non-empty size list"
    )]
    pub fn cycle(&self, index: u64) -> usize {
        let len = self.0.len() as u64;
        usize::try_from(index % len)
            .ok()
            .and_then(|i| self.0.get(i).copied())
            .unwrap_or(DEFAULT_PAYLOAD_SIZE)
    }

    /// Uniformly random size from the set.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.0.choose(rng).copied().unwrap_or(DEFAULT_PAYLOAD_SIZE)
    }
}

impl Default for PayloadSizes {
    fn default() -> Self { Self::single(DEFAULT_PAYLOAD_SIZE) }
}

impl FromStr for PayloadSizes {
    type Err = PayloadSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sizes = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<usize>()
                    .map_err(|_| PayloadSizeError::Invalid(part.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(sizes)
    }
}

#[derive(Serialize)]
struct PayloadBody<'a> {
    id: u64,
    ts: i64,
    priority: &'a str,
    data: &'a str,
}

/// Build a payload body of exactly `size` bytes.
///
/// `ts_ms` is the millisecond timestamp written into the body; callers pass
/// the wall clock in production and a fixed value in tests.
#[must_use]
pub fn build_payload(id: EventId, priority: Priority, size: usize, ts_ms: i64) -> Bytes {
    let render = |data: &str| {
        serde_json::to_vec(&PayloadBody {
            id: id.as_u64(),
            ts: ts_ms,
            priority: priority.name(),
            data,
        })
        .unwrap_or_default()
    };
    let mut body = render("");
    if body.len() < size {
        body = render(&"x".repeat(size - body.len()));
    }
    body.truncate(size);
    body.resize(size, b' ');
    Bytes::from(body)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 { chrono::Utc::now().timestamp_millis() }
