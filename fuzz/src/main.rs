//! AFL fuzz target for the reference frame decoder.
//!
//! Every input is parsed as one frame and also fed through the streaming
//! codec. Decode errors are expected; a panic, or a parsed frame that does
//! not re-encode to the input bytes, is a finding.

use bytes::BytesMut;
use evstress::frame::{DEFAULT_MAX_FRAME_LEN, EventCodec, LENGTH_PREFIX_LEN, encode, parse_frame};
use tokio_util::codec::Decoder;

fn check(data: &[u8]) {
    if let Ok(frame) = parse_frame(data) {
        let reencoded = encode(frame.priority, &frame.topic, &frame.payload);
        assert!(matches!(reencoded, Ok(bytes) if bytes.as_ref() == data));
    }

    let mut codec = EventCodec::new();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        assert!(frame.priority <= 4);
    }
}

fn main() {
    afl::fuzz!(|data: &[u8]| {
        if data.len() <= LENGTH_PREFIX_LEN + DEFAULT_MAX_FRAME_LEN {
            check(data);
        }
    });
}
