//! Event frame encoding and the reference decoder.
//!
//! Every event travels as one length-prefixed frame, identical on TCP and UDP:
//!
//! | Field          | Offset | Size | Description                              |
//! |----------------|--------|------|------------------------------------------|
//! | `frame_length` | 0      | 4    | Bytes that follow this field (big-endian) |
//! | priority       | 4      | 1    | Tier `0..=4`                             |
//! | `topic_length` | 5      | 2    | Topic length in bytes (big-endian)       |
//! | topic          | 7      | var  | UTF-8 topic                              |
//! | payload        | var    | var  | Opaque payload, the rest of the frame    |
//!
//! The harness only ever encodes. [`parse_frame`] and [`EventCodec`] exist so
//! tests, the fuzz target and the capture receiver can check what was sent.

mod codec;
mod decode;
mod encode;
pub mod errors;

pub use codec::EventCodec;
pub use decode::{DecodedFrame, parse_body, parse_frame, read_u16, read_u32};
pub use encode::{encode, encode_into, encode_raw};
pub use errors::{DecodeError, EncodingError};

/// Size of the `frame_length` prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;
/// Priority byte plus topic length field.
pub const BODY_HEADER_LEN: usize = 3;
/// Longest topic representable in the 16-bit length field.
pub const MAX_TOPIC_LEN: usize = u16::MAX as usize;
/// Highest valid priority tier.
pub const MAX_PRIORITY: u8 = 4;
/// Largest body the 32-bit length field can describe.
pub const MAX_BODY_LEN: usize = u32::MAX as usize;
/// Frame cap enforced by the receiver (10 MiB); used as the decoder default.
pub const DEFAULT_MAX_FRAME_LEN: usize = 10 * 1024 * 1024;
/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_DATAGRAM_LEN: usize = 65_507;
