//! Property and example tests for the event frame codec.

use bytes::BytesMut;
use evstress::{
    event::{Event, EventId, Priority},
    frame::{DecodedFrame, EncodingError, EventCodec, encode, encode_into, parse_frame, read_u32},
};
use proptest::prelude::*;
use rstest::rstest;
use tokio_util::codec::Decoder;

fn decode_chunks(chunks: &[&[u8]]) -> Vec<DecodedFrame> {
    let mut codec = EventCodec::new();
    let mut buf = BytesMut::new();
    let mut out = Vec::new();
    for chunk in chunks {
        buf.extend_from_slice(chunk);
        while let Some(frame) = codec.decode(&mut buf).expect("decode") {
            out.push(frame);
        }
    }
    assert!(buf.is_empty(), "trailing bytes left in decoder");
    out
}

fn topic_strategy() -> impl Strategy<Value = String> { "[a-z0-9/._-]{0,64}" }

proptest! {
    /// Any valid event decodes back to what was encoded.
    #[test]
    fn roundtrip(
        priority in 0_u8..=4,
        topic in topic_strategy(),
        payload in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let bytes = encode(priority, &topic, &payload).expect("encode");
        let frame = parse_frame(&bytes).expect("parse");
        prop_assert_eq!(frame.priority, priority);
        prop_assert_eq!(frame.topic, topic);
        prop_assert_eq!(frame.payload.as_ref(), payload.as_slice());
    }

    /// The length prefix counts every byte after itself.
    #[test]
    fn length_field_matches_body(
        priority in 0_u8..=4,
        topic in topic_strategy(),
        payload_len in 0_usize..4096,
    ) {
        let payload = vec![0x5a; payload_len];
        let bytes = encode(priority, &topic, &payload).expect("encode");
        let declared = read_u32(&bytes).expect("prefix");
        prop_assert_eq!(declared as usize, bytes.len() - 4);
        prop_assert_eq!(declared as usize, 3 + topic.len() + payload_len);
    }

    /// A concatenation of frames decodes identically however it is cut.
    #[test]
    fn fragmentation_invariance(
        events in proptest::collection::vec(
            (0_u8..=4, topic_strategy(), proptest::collection::vec(any::<u8>(), 0..256)),
            1..6,
        ),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut wire = BytesMut::new();
        for (priority, topic, payload) in &events {
            encode_into(&mut wire, *priority, topic, payload).expect("encode");
        }
        let whole = decode_chunks(&[wire.as_ref()]);
        prop_assert_eq!(whole.len(), events.len());

        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(wire.len() + 1)).collect();
        offsets.sort_unstable();
        offsets.dedup();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for offset in offsets {
            chunks.push(&wire[start..offset]);
            start = offset;
        }
        chunks.push(&wire[start..]);
        prop_assert_eq!(decode_chunks(&chunks), whole);
    }
}

#[rstest]
fn system_alert_example_is_byte_exact() {
    let bytes = encode(3, "system/alerts", b"High severity alert").expect("encode");
    assert_eq!(
        bytes.as_ref(),
        b"\x00\x00\x00\x23\x03\x00\x0dsystem/alertsHigh severity alert"
    );
    assert_eq!(bytes.len(), 39);
}

#[rstest]
fn priority_five_produces_no_bytes() {
    let mut buf = BytesMut::from(&b"keep"[..]);
    let err = encode_into(&mut buf, 5, "system/alerts", b"x").expect_err("rejected");
    assert_eq!(err, EncodingError::InvalidPriority(5));
    assert_eq!(buf.as_ref(), b"keep");
}

#[rstest]
fn duplicate_events_encode_identically() {
    let event = Event::new(
        EventId::new(42),
        Priority::Critical,
        "trading/orders",
        bytes::Bytes::from_static(b"{\"id\":42}"),
    );
    let resent = event.clone();
    assert_eq!(event.encode().expect("encode"), resent.encode().expect("encode"));
}
