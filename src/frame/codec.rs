//! Tokio codec adapter for event framing.
//!
//! [`EventCodec`] implements [`Decoder`] and [`Encoder`] so frames can be read
//! from a [`tokio_util::codec::FramedRead`] regardless of how the sender split
//! them across writes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//! use evstress::frame::EventCodec;
//!
//! async fn drain(stream: TcpStream) {
//!     let mut frames = FramedRead::new(stream, EventCodec::new());
//!     while let Some(Ok(frame)) = frames.next().await {
//!         println!("{} {}", frame.priority, frame.topic);
//!     }
//! }
//! ```

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{
    BODY_HEADER_LEN,
    DEFAULT_MAX_FRAME_LEN,
    DecodeError,
    DecodedFrame,
    LENGTH_PREFIX_LEN,
    parse_body,
    read_u32,
};
use crate::event::Event;

/// Streaming codec for length-prefixed event frames.
#[derive(Debug, Clone, Copy)]
pub struct EventCodec {
    max_frame_len: usize,
}

impl EventCodec {
    /// Create a codec using the receiver's 10 MiB frame cap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Create a codec with a custom body length limit.
    #[must_use]
    pub const fn with_max_frame_len(max_frame_len: usize) -> Self { Self { max_frame_len } }

    /// Configured body length limit.
    #[must_use]
    pub const fn max_frame_len(&self) -> usize { self.max_frame_len }
}

impl Default for EventCodec {
    fn default() -> Self { Self::new() }
}

impl Decoder for EventCodec {
    type Error = io::Error;
    type Item = DecodedFrame;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Ok(declared) = read_u32(src) else {
            return Ok(None);
        };
        let body_len = declared as usize;
        if body_len > self.max_frame_len {
            return Err(DecodeError::FrameTooLarge {
                len: body_len,
                max: self.max_frame_len,
            }
            .into());
        }
        if body_len < BODY_HEADER_LEN {
            return Err(DecodeError::BodyTooShort(body_len).into());
        }

        let frame_len = LENGTH_PREFIX_LEN + body_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_LEN);
        let body = src.split_to(body_len);
        parse_body(&body).map(Some).map_err(Into::into)
    }
}

impl<'a> Encoder<&'a Event> for EventCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &'a Event, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst)
            .map(|_| ())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
    }
}
