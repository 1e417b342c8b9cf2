//! Frame encoder.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use bytes::{BufMut, Bytes, BytesMut};

use super::{BODY_HEADER_LEN, EncodingError, LENGTH_PREFIX_LEN, MAX_PRIORITY};

/// Validated header fields, computed before any byte is written.
struct Header {
    priority: u8,
    topic_len: u16,
    body_len: u32,
}

fn validate(priority: u8, topic_len: usize, payload_len: usize) -> Result<Header, EncodingError> {
    if priority > MAX_PRIORITY {
        return Err(EncodingError::InvalidPriority(priority));
    }
    let topic_len16 = u16::try_from(topic_len).map_err(|_| EncodingError::TopicTooLong(topic_len))?;
    let body = BODY_HEADER_LEN
        .checked_add(topic_len)
        .and_then(|n| n.checked_add(payload_len))
        .ok_or(EncodingError::FrameTooLarge(usize::MAX))?;
    let body_len = u32::try_from(body).map_err(|_| EncodingError::FrameTooLarge(body))?;
    Ok(Header {
        priority,
        topic_len: topic_len16,
        body_len,
    })
}

fn put_frame(dst: &mut BytesMut, header: &Header, topic: &[u8], payload: &[u8]) -> usize {
    let total = LENGTH_PREFIX_LEN + header.body_len as usize;
    dst.reserve(total);
    dst.put_u32(header.body_len);
    dst.put_u8(header.priority);
    dst.put_u16(header.topic_len);
    dst.put_slice(topic);
    dst.put_slice(payload);
    total
}

/// Encode one event into a new buffer.
///
/// # Errors
/// Returns [`EncodingError`] if `priority > 4`, the topic exceeds 65535 bytes
/// or the body does not fit the 32-bit length field.
///
/// # Examples
///
/// ```
/// use evstress::frame::encode;
///
/// let frame = encode(3, "system/alerts", b"High severity alert").unwrap();
/// assert_eq!(&frame[..7], &[0x00, 0x00, 0x00, 0x23, 0x03, 0x00, 0x0D]);
/// ```
pub fn encode(priority: u8, topic: &str, payload: &[u8]) -> Result<Bytes, EncodingError> {
    let mut dst = BytesMut::new();
    encode_into(&mut dst, priority, topic, payload)?;
    Ok(dst.freeze())
}

/// Encode one event from a raw topic byte slice.
///
/// # Errors
/// As [`encode`], plus [`EncodingError::InvalidTopicEncoding`] when `topic`
/// is not UTF-8.
pub fn encode_raw(priority: u8, topic: &[u8], payload: &[u8]) -> Result<Bytes, EncodingError> {
    let text = std::str::from_utf8(topic).map_err(|_| EncodingError::InvalidTopicEncoding)?;
    encode(priority, text, payload)
}

/// Append one encoded frame to `dst`, returning the number of bytes written.
///
/// Validation happens first, so `dst` is unchanged on error.
///
/// # Errors
/// See [`encode`].
pub fn encode_into(
    dst: &mut BytesMut,
    priority: u8,
    topic: &str,
    payload: &[u8],
) -> Result<usize, EncodingError> {
    let header = validate(priority, topic.len(), payload.len())?;
    Ok(put_frame(dst, &header, topic.as_bytes(), payload))
}
