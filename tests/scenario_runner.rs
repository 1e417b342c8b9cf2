//! Catalogue scenarios driven into in-memory sinks.

use std::collections::HashMap;

use bytes::BytesMut;
use evstress::{
    frame::{DecodedFrame, EventCodec, parse_frame},
    metrics::WorkerProgress,
    payload::PayloadSizes,
    scenario::{RunnerOutcome, ScenarioParams, ScenarioSpec, find, run_scenario},
    stop::StopSignal,
    test_helpers::RecordingSink,
};
use rstest::{fixture, rstest};
use tokio_util::codec::Decoder;

#[fixture]
fn params() -> ScenarioParams {
    ScenarioParams {
        events: 60,
        payload_sizes: PayloadSizes::new(vec![48, 128, 512]).expect("sizes"),
        seed: 11,
        duplicate_interval: 5,
        overflow_capacity: 50,
        ..ScenarioParams::default()
    }
}

fn spec(name: &str, params: &ScenarioParams) -> ScenarioSpec {
    find(name).expect("catalogue entry").build(params)
}

fn reassemble(bytes: &[u8]) -> Vec<DecodedFrame> {
    let mut codec = EventCodec::new();
    let mut buf = BytesMut::from(bytes);
    let mut frames = Vec::new();
    while let Some(frame) = codec.decode(&mut buf).expect("decode") {
        frames.push(frame);
    }
    assert!(buf.is_empty());
    frames
}

#[rstest]
#[case("sweep")]
#[case("burst")]
#[case("duplicates")]
#[case("fragmented")]
#[case("sticky")]
#[case("chaos")]
#[case("tiered")]
#[case("overflow")]
#[case("reconnect")]
#[tokio::test(start_paused = true)]
async fn stream_bytes_reassemble_into_every_event(#[case] name: &str, params: ScenarioParams) {
    let scenario = spec(name, &params);
    let mut sink = RecordingSink::stream();
    let progress = WorkerProgress::default();
    let outcome = run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    assert_eq!(outcome, RunnerOutcome::Completed);

    let frames = reassemble(&sink.bytes());
    assert_eq!(frames.len() as u64, scenario.count);
    let snap = progress.snapshot();
    assert_eq!((snap.attempted, snap.sent, snap.errors), (scenario.count, scenario.count, 0));
    for frame in &frames {
        assert!(frame.priority <= 4);
        assert!(!frame.topic.is_empty());
    }
}

#[rstest]
#[tokio::test]
async fn overflow_sends_past_capacity(params: ScenarioParams) {
    let scenario = spec("overflow", &params);
    let mut sink = RecordingSink::stream();
    let progress = WorkerProgress::default();
    let outcome = run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    assert_eq!(outcome, RunnerOutcome::Completed);
    let snap = progress.snapshot();
    assert_eq!(snap.attempted, scenario.count);
    assert!(snap.attempted > params.overflow_capacity);

    let frames = reassemble(&sink.bytes());
    assert!(frames.iter().all(|f| f.priority == frames[0].priority));
}

#[rstest]
#[tokio::test]
async fn sweep_sends_every_pair_equally(mut params: ScenarioParams) {
    params.events = 300;
    let scenario = spec("sweep", &params);
    let mut sink = RecordingSink::stream();
    let progress = WorkerProgress::default();
    run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");

    let mut per_pair: HashMap<(u8, String), u64> = HashMap::new();
    for frame in reassemble(&sink.bytes()) {
        *per_pair.entry((frame.priority, frame.topic)).or_default() += 1;
    }
    assert_eq!(per_pair.len(), 105);
    assert!(per_pair.values().all(|&n| n == 3), "{per_pair:?}");
}

#[rstest]
#[tokio::test]
async fn fragmented_writes_do_not_align_with_frames(params: ScenarioParams) {
    let scenario = spec("fragmented", &params);
    let mut sink = RecordingSink::stream();
    let progress = WorkerProgress::default();
    run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    let writes = sink.writes();
    assert_eq!(writes.len(), 60);
    assert!(writes.iter().any(|w| parse_frame(w).is_err()));
}

#[rstest]
#[tokio::test]
async fn duplicates_are_byte_identical(params: ScenarioParams) {
    let scenario = spec("duplicates", &params);
    let mut sink = RecordingSink::stream();
    let progress = WorkerProgress::default();
    run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    let writes = sink.writes();
    // Window of five fresh events, then the window head again.
    assert_eq!(writes[5], writes[0]);
    assert_eq!(writes[11], writes[6]);
    assert_ne!(writes[6], writes[0]);
}

#[rstest]
#[tokio::test]
async fn partial_stream_failure_accounts_for_every_event(params: ScenarioParams) {
    let scenario = spec("burst", &params);
    let mut sink = RecordingSink::stream().fail_after(25);
    let progress = WorkerProgress::default();
    let outcome = run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    assert_eq!(outcome, RunnerOutcome::TransportFailed);
    let snap = progress.snapshot();
    assert_eq!(snap.attempted, 60);
    assert_eq!(snap.sent, 25);
    assert_eq!(snap.errors, 35);
    assert_eq!(sink.writes().len(), 25);
}

#[rstest]
#[tokio::test]
async fn datagram_failures_stay_isolated(params: ScenarioParams) {
    let scenario = spec("udp-burst", &params);
    let mut sink = RecordingSink::datagram().fail_after(30);
    let progress = WorkerProgress::default();
    let outcome = run_scenario(&mut sink, &scenario, &progress, StopSignal::never())
        .await
        .expect("run");
    assert_eq!(outcome, RunnerOutcome::Completed);
    let snap = progress.snapshot();
    assert_eq!((snap.attempted, snap.sent, snap.errors), (60, 59, 1));
    for write in sink.writes() {
        parse_frame(&write).expect("one frame per datagram");
    }
}
