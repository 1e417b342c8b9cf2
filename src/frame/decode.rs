//! Reference decoder mirroring the receiver's validation rules.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use bytes::Bytes;

use super::{BODY_HEADER_LEN, DecodeError, LENGTH_PREFIX_LEN, MAX_PRIORITY};

/// A frame parsed back into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Priority tier (`0..=4`).
    pub priority: u8,
    /// UTF-8 topic; may be empty.
    pub topic: String,
    /// Remaining body bytes.
    pub payload: Bytes,
}

/// Read a big-endian `u32` from the start of `buf`.
///
/// # Errors
/// Returns [`DecodeError::ShortBuffer`] if `buf` is shorter than four bytes.
pub fn read_u32(buf: &[u8]) -> Result<u32, DecodeError> {
    buf.first_chunk::<4>()
        .map(|b| u32::from_be_bytes(*b))
        .ok_or(DecodeError::ShortBuffer)
}

/// Read a big-endian `u16` from the start of `buf`.
///
/// # Errors
/// Returns [`DecodeError::ShortBuffer`] if `buf` is shorter than two bytes.
pub fn read_u16(buf: &[u8]) -> Result<u16, DecodeError> {
    buf.first_chunk::<2>()
        .map(|b| u16::from_be_bytes(*b))
        .ok_or(DecodeError::ShortBuffer)
}

/// Parse exactly one frame, length prefix included.
///
/// # Errors
/// Returns [`DecodeError`] if the prefix disagrees with the buffer length or
/// the body is malformed.
pub fn parse_frame(buf: &[u8]) -> Result<DecodedFrame, DecodeError> {
    let declared = read_u32(buf)? as usize;
    let body = buf.get(LENGTH_PREFIX_LEN..).ok_or(DecodeError::ShortBuffer)?;
    if body.len() != declared {
        return Err(DecodeError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    parse_body(body)
}

/// Parse a frame body (everything after the length prefix).
///
/// # Errors
/// Returns [`DecodeError`] when the body is shorter than its header, carries
/// an invalid priority, or declares a topic longer than the body.
pub fn parse_body(body: &[u8]) -> Result<DecodedFrame, DecodeError> {
    let Some((header, rest)) = body.split_at_checked(BODY_HEADER_LEN) else {
        return Err(DecodeError::BodyTooShort(body.len()));
    };
    let priority = header.first().copied().ok_or(DecodeError::ShortBuffer)?;
    if priority > MAX_PRIORITY {
        return Err(DecodeError::InvalidPriority(priority));
    }
    let topic_len = usize::from(read_u16(header.get(1..).ok_or(DecodeError::ShortBuffer)?)?);
    let Some((topic_bytes, payload)) = rest.split_at_checked(topic_len) else {
        return Err(DecodeError::TopicOverrun {
            topic_len,
            remaining: rest.len(),
        });
    };
    let topic = std::str::from_utf8(topic_bytes)
        .map_err(|_| DecodeError::InvalidTopicEncoding)?
        .to_owned();
    Ok(DecodedFrame {
        priority,
        topic,
        payload: Bytes::copy_from_slice(payload),
    })
}
