//! Error types for frame encoding and the reference decoder.

use std::io;

use thiserror::Error;

/// Reasons an event cannot be encoded.
///
/// These are programming or configuration mistakes in the harness itself and
/// are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Priority outside `0..=4`.
    #[error("invalid priority {0}")]
    InvalidPriority(u8),
    /// Topic longer than 65535 bytes.
    #[error("topic too long: {0} bytes")]
    TopicTooLong(usize),
    /// Topic bytes are not UTF-8.
    #[error("topic is not valid UTF-8")]
    InvalidTopicEncoding,
    /// Body does not fit the 32-bit length field.
    #[error("frame body too large: {0} bytes")]
    FrameTooLarge(usize),
}

/// Reasons a byte sequence is not a valid frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer is too short to contain the expected field.
    #[error("buffer too short")]
    ShortBuffer,
    /// The declared `frame_length` does not match the bytes supplied.
    #[error("length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Value of the length prefix.
        declared: usize,
        /// Bytes present after the prefix.
        actual: usize,
    },
    /// Body shorter than the priority byte plus topic length field.
    #[error("frame body too short: {0} bytes")]
    BodyTooShort(usize),
    /// Priority outside `0..=4`.
    #[error("invalid priority {0}")]
    InvalidPriority(u8),
    /// Declared topic length runs past the end of the body.
    #[error("topic length {topic_len} exceeds remaining body {remaining}")]
    TopicOverrun {
        /// Declared topic length.
        topic_len: usize,
        /// Bytes left in the body after the header.
        remaining: usize,
    },
    /// Topic bytes are not UTF-8.
    #[error("topic is not valid UTF-8")]
    InvalidTopicEncoding,
    /// Declared frame larger than the decoder limit.
    #[error("frame too large: {len} bytes exceeds limit {max}")]
    FrameTooLarge {
        /// Declared body length.
        len: usize,
        /// Configured limit.
        max: usize,
    },
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> Self { Self::new(io::ErrorKind::InvalidData, err) }
}
