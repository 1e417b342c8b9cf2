//! Event model shared by the codec, the scenario planner and the runner.
//!
//! An [`Event`] is the unit the harness puts on the wire. Its [`EventId`] is
//! harness-side bookkeeping only and never appears in the encoded frame.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::frame::{self, EncodingError};

/// Priority tier carried in the first body byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Deferred bulk traffic.
    Batch = 0,
    /// Low-priority traffic.
    Low = 1,
    /// Medium-priority traffic.
    Medium = 2,
    /// High-priority traffic.
    High = 3,
    /// Critical traffic.
    Critical = 4,
}

impl Priority {
    /// Every tier in ascending wire order.
    pub const ALL: [Self; 5] = [
        Self::Batch,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// Wire representation of the tier.
    #[must_use]
    pub const fn as_u8(self) -> u8 { self as u8 }

    /// Upper-case tier name used in payload bodies and log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Batch => "BATCH",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Tier selected by rotating through [`Priority::ALL`] with `index`.
    #[must_use]
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "rotation over a fixed tier count"
    )]
    pub const fn rotating(index: u64) -> Self {
        match index % 5 {
            0 => Self::Batch,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::Critical,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Batch),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            4 => Ok(Self::Critical),
            other => Err(EncodingError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self { value.as_u8() }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Harness-local event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self { Self(raw) }

    /// Return the raw identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self { Self(value) }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A single event ready to be framed.
///
/// `payload` is reference counted so duplicate injection can resend the same
/// bytes without copying them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Harness-side identifier; not encoded.
    pub id: EventId,
    /// Priority tier.
    pub priority: Priority,
    /// Routing topic.
    pub topic: String,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Event {
    /// Construct an event.
    #[must_use]
    pub fn new(id: EventId, priority: Priority, topic: impl Into<String>, payload: Bytes) -> Self {
        Self {
            id,
            priority,
            topic: topic.into(),
            payload,
        }
    }

    /// Length of the encoded frame, prefix included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        frame::LENGTH_PREFIX_LEN + frame::BODY_HEADER_LEN + self.topic.len() + self.payload.len()
    }

    /// Encode the event into a freshly allocated frame.
    ///
    /// # Errors
    /// Returns [`EncodingError`] when the topic or body exceed the frame limits.
    pub fn encode(&self) -> Result<Bytes, EncodingError> {
        frame::encode(self.priority.as_u8(), &self.topic, &self.payload)
    }

    /// Append the encoded frame to `dst`.
    ///
    /// # Errors
    /// Returns [`EncodingError`] when the topic or body exceed the frame
    /// limits; `dst` is left untouched in that case.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<usize, EncodingError> {
        frame::encode_into(dst, self.priority.as_u8(), &self.topic, &self.payload)
    }
}
