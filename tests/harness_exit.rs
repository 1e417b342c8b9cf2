//! Exit status of complete harness runs.

use std::{process::ExitCode, time::Duration};

use evstress::{
    harness::{Commands, HarnessConfig, ResolvedCli, exit_code, run_with_cli},
    metrics::{MetricsAggregator, WorkerOutcome, WorkerResult},
};
use rstest::{fixture, rstest};
use test_util::{CaptureServer, refused_addr};

#[fixture]
fn config() -> HarnessConfig {
    HarnessConfig {
        host: "127.0.0.1".to_owned(),
        tcp_port: 0,
        udp_port: 0,
        workers: 2,
        pool_size: 2,
        events_per_worker: 25,
        payload_sizes: "96".to_owned(),
        scenario: "burst".to_owned(),
        seed: 3,
        timeout_secs: 30,
        backoff_ms: 100,
        io_timeout_ms: 2000,
        pace_us: 0,
        overflow_capacity: 16_384,
        duplicate_interval: 10,
        id_stride: 10_000,
    }
}

fn resolved(config: HarnessConfig) -> ResolvedCli {
    ResolvedCli {
        config,
        command: None,
    }
}

fn worker(worker_id: usize, sent: u64, outcome: WorkerOutcome) -> WorkerResult {
    WorkerResult {
        worker_id,
        scenario: "burst".to_owned(),
        attempted: 1000,
        sent,
        errors: 1000 - sent,
        elapsed: Duration::from_millis(5),
        outcome,
    }
}

#[rstest]
#[tokio::test]
async fn run_uses_the_given_configuration(mut config: HarnessConfig) {
    let server = CaptureServer::start().await.expect("capture");
    config.tcp_port = server.tcp_addr().port();
    config.udp_port = server.udp_addr().port();

    let code = run_with_cli(resolved(config)).await.expect("run");
    assert_eq!(code, ExitCode::SUCCESS);
    let frames = server.wait_for_frames(50, Duration::from_secs(10)).await;
    assert_eq!(frames.len(), 50);
    assert_eq!(server.connections(), 2);
}

#[rstest]
#[tokio::test]
async fn unreachable_receiver_fails_the_run(mut config: HarnessConfig) {
    let closed = refused_addr().await.expect("addr");
    config.tcp_port = closed.port();
    config.udp_port = closed.port();

    let code = run_with_cli(resolved(config)).await.expect("run");
    assert_eq!(code, ExitCode::FAILURE);
}

#[rstest]
#[tokio::test]
async fn list_needs_no_receiver(mut config: HarnessConfig) {
    config.host = "receiver.invalid".to_owned();
    let cli = ResolvedCli {
        config,
        command: Some(Commands::List),
    };
    assert_eq!(run_with_cli(cli).await.expect("list"), ExitCode::SUCCESS);
}

#[rstest]
#[case::all_completed(WorkerOutcome::Completed, ExitCode::SUCCESS)]
#[case::deadline(WorkerOutcome::Abandoned, ExitCode::SUCCESS)]
#[case::reset_mid_run(WorkerOutcome::TransportFailed, ExitCode::FAILURE)]
#[case::never_connected(WorkerOutcome::ConnectFailed, ExitCode::FAILURE)]
fn exit_code_reflects_connection_loss(#[case] outcome: WorkerOutcome, #[case] expected: ExitCode) {
    let metrics = MetricsAggregator::new();
    metrics.merge(&worker(0, 1000, WorkerOutcome::Completed));
    metrics.merge(&worker(1, 5, outcome));
    assert_eq!(exit_code(&metrics.snapshot()), expected);
}
